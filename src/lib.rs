pub mod document;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;
pub mod temporal;

pub use query::{
    build_predicate, build_sql_filter, try_build_predicate, FieldAliases, Predicate,
    QueryParseError, SqlFilter,
};
pub use record::{Field, Record, RecordRef, Scalar};
pub use schema::{FieldType, RecordShape, Schema, Shape};
