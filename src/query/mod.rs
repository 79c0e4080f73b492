pub mod ast;
pub mod convert;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod plan;
pub mod predicate;
pub mod resolve;
pub mod sql;
pub mod token;

use std::panic::{self, AssertUnwindSafe};

pub use error::{QueryParseError, QueryResult};
pub use predicate::Predicate;
pub use resolve::FieldAliases;
pub use sql::SqlFilter;

use crate::schema::RecordShape;

/// Lexes, parses and lowers `query` against `shape`.
pub fn compile_plan(
    query: &str,
    shape: RecordShape<'_>,
    aliases: Option<&FieldAliases>,
) -> QueryResult<plan::Plan> {
    let tokens = lexer::tokenize(query)?;
    let node = parser::parse(tokens)?;
    plan::lower(&node, shape, aliases)
}

/// Compiles `query` into a predicate over records of `shape`.
///
/// Blank query text matches every record and skips the pipeline entirely.
pub fn build_predicate(
    query: &str,
    shape: RecordShape<'_>,
    aliases: Option<&FieldAliases>,
) -> QueryResult<Predicate> {
    if query.trim().is_empty() {
        tracing::debug!(root = %shape.shape.name, "empty query, matching all records");
        return Ok(Predicate::always());
    }

    tracing::debug!(query, root = %shape.shape.name, "compiling filter");
    match compile_plan(query, shape, aliases) {
        Ok(plan) => Ok(Predicate::compile(plan)),
        Err(e) => {
            tracing::debug!(error = %e, "filter rejected");
            Err(e)
        }
    }
}

/// Like [`build_predicate`], but reports failures as a message fit for display.
/// A panic anywhere in the pipeline is reported as an unexpected error; the
/// process panic hook still runs first, so the default hook also prints it to
/// stderr.
pub fn try_build_predicate(
    query: &str,
    shape: RecordShape<'_>,
    aliases: Option<&FieldAliases>,
) -> Result<Predicate, String> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| build_predicate(query, shape, aliases)));
    match outcome {
        Ok(Ok(predicate)) => Ok(predicate),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(query, %detail, "filter compilation panicked");
            Err(format!("unexpected error: {}", detail))
        }
    }
}

/// Compiles `query` into a parameterized SQL `WHERE` fragment.
pub fn build_sql_filter(
    query: &str,
    shape: RecordShape<'_>,
    aliases: Option<&FieldAliases>,
) -> QueryResult<SqlFilter> {
    if query.trim().is_empty() {
        return Ok(SqlFilter::match_all());
    }
    tracing::debug!(query, root = %shape.shape.name, "rendering sql filter");
    compile_plan(query, shape, aliases).map(|plan| SqlFilter::render(&plan))
}
