use ignore::WalkBuilder;
use serde_yaml::Value as YamlValue;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

const RECORD_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Records read from one file: a single mapping, or each mapping of a top-level sequence.
pub struct RecordFile {
    pub path: PathBuf,
    pub records: Vec<YamlValue>,
}

impl RecordFile {
    /// `path`, or `path#index` when the file holds several records.
    pub fn label(&self, index: usize) -> String {
        if self.records.len() == 1 {
            self.path.display().to_string()
        } else {
            format!("{}#{}", self.path.display(), index)
        }
    }
}

pub fn collect_record_files(data_path: &Path) -> Vec<PathBuf> {
    if data_path.is_file() {
        return vec![data_path.to_path_buf()];
    }

    let mut files = Vec::new();

    let walker = WalkBuilder::new(data_path)
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .add_custom_ignore_filename(".rfqignore")
        .build();

    for entry in walker.flatten() {
        let path = entry.path();
        if path.is_file() && has_record_extension(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    files
}

pub fn read_paths_from_stdin() -> Vec<PathBuf> {
    let stdin = io::stdin();
    stdin
        .lock()
        .lines()
        .map_while(Result::ok)
        .filter(|line| !line.trim().is_empty())
        .map(PathBuf::from)
        .collect()
}

pub fn load_record_file(path: &Path) -> Option<RecordFile> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::trace!(path = %path.display(), error = %e, "skipping unreadable file");
            return None;
        }
    };
    let records = parse_records(&content).or_else(|| {
        tracing::trace!(path = %path.display(), "skipping file without records");
        None
    })?;
    Some(RecordFile {
        path: path.to_path_buf(),
        records,
    })
}

fn parse_records(content: &str) -> Option<Vec<YamlValue>> {
    let value: YamlValue = serde_yaml::from_str(content).ok()?;
    match value {
        YamlValue::Mapping(_) => Some(vec![value]),
        YamlValue::Sequence(items) => {
            let records: Vec<YamlValue> = items.into_iter().filter(YamlValue::is_mapping).collect();
            (!records.is_empty()).then_some(records)
        }
        _ => None,
    }
}

fn has_record_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| RECORD_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}
