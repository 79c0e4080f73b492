use clap::Parser;
use rfq::document::Document;
use rfq::query::{self, FieldAliases};
use rfq::schema::{RecordShape, Schema};
use rfq::store;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rfq", about = "Filter typed record files with a boolean query")]
struct Cli {
    #[arg(long, env = "RFQ_SCHEMA", help = "YAML file describing the record shapes")]
    schema: Option<PathBuf>,

    #[arg(long, help = "Shape to query (defaults to the schema's root)")]
    root: Option<String>,

    #[arg(long, env = "RFQ_DATA", help = "Record file or directory of record files")]
    data: Option<PathBuf>,

    #[arg(long, help = "Read record file paths from stdin")]
    stdin: bool,

    #[arg(long = "alias", value_name = "LABEL=FIELD", value_parser = parse_alias, help = "Map a display label to a field name")]
    aliases: Vec<(String, String)>,

    #[arg(long, help = "Print the query as a SQL WHERE fragment instead of filtering")]
    sql: bool,

    #[arg(long, help = "Only check that the query compiles")]
    check: bool,

    #[arg(help = "Filter query, e.g. 'Age >= 18 AND Mentor.Age > 50'")]
    query: Option<String>,
}

fn parse_alias(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((label, field)) if !label.trim().is_empty() && !field.trim().is_empty() => {
            Ok((label.trim().to_string(), field.trim().to_string()))
        }
        _ => Err(format!("expected LABEL=FIELD, got '{}'", s)),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RFQ_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(schema_path) = cli.schema.as_deref() else {
        eprintln!("Error: No schema specified. Use --schema or set RFQ_SCHEMA");
        return ExitCode::from(2);
    };

    let schema = match Schema::load(schema_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Schema error: {}", e);
            return ExitCode::from(2);
        }
    };

    let shape = match schema.root(cli.root.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Schema error: {}", e);
            return ExitCode::from(2);
        }
    };

    let mut aliases: FieldAliases = shape.shape.aliases.iter().collect();
    aliases.extend(cli.aliases.iter().map(|(label, field)| (label, field.clone())));

    let query_str = cli.query.as_deref().unwrap_or_default();

    if cli.check {
        return run_check_mode(query_str, shape, &aliases);
    }

    if cli.sql {
        return run_sql_mode(query_str, shape, &aliases);
    }

    let files = if cli.stdin {
        store::read_paths_from_stdin()
    } else {
        match cli.data.as_deref() {
            Some(path) => store::collect_record_files(path),
            None => {
                eprintln!("Error: No data path specified. Use --data, set RFQ_DATA or pass --stdin");
                return ExitCode::from(2);
            }
        }
    };

    run_query_mode(&files, query_str, shape, &aliases, cli.data.as_deref())
}

fn run_check_mode(query_str: &str, shape: RecordShape<'_>, aliases: &FieldAliases) -> ExitCode {
    match query::try_build_predicate(query_str, shape, Some(aliases)) {
        Ok(_) => ExitCode::from(0),
        Err(message) => {
            eprintln!("Query error: {}", message);
            ExitCode::from(2)
        }
    }
}

fn run_sql_mode(query_str: &str, shape: RecordShape<'_>, aliases: &FieldAliases) -> ExitCode {
    let filter = match query::build_sql_filter(query_str, shape, Some(aliases)) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Query error: {}", e);
            return ExitCode::from(2);
        }
    };

    println!("{}", filter.clause);
    for (i, param) in filter.params.iter().enumerate() {
        println!("${} = {}", i + 1, param);
    }
    ExitCode::from(0)
}

fn run_query_mode(
    files: &[PathBuf],
    query_str: &str,
    shape: RecordShape<'_>,
    aliases: &FieldAliases,
    data_path: Option<&Path>,
) -> ExitCode {
    let predicate = match query::try_build_predicate(query_str, shape, Some(aliases)) {
        Ok(p) => p,
        Err(message) => {
            eprintln!("Query error: {}", message);
            return ExitCode::from(2);
        }
    };

    let mut found = false;

    for file in files.iter().filter_map(|path| store::load_record_file(path)) {
        for (index, value) in file.records.iter().enumerate() {
            let Some(doc) = Document::new(shape.schema, shape.shape, value) else {
                continue;
            };
            if predicate.matches(&doc) {
                found = true;
                let label = file.label(index);
                let display = data_path
                    .filter(|base| base.is_dir())
                    .and_then(|base| Path::new(&label).strip_prefix(base).ok())
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| label.clone());
                println!("{}", display);
            }
        }
    }

    if found {
        ExitCode::from(0)
    } else {
        ExitCode::from(1)
    }
}
