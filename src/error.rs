//! Errors raised while reading and interpreting feed tables.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("Required table {table} not found at {}", .path.display())]
    MissingTable { table: String, path: PathBuf },
    #[error("Failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {table}: {source}")]
    Csv { table: String, source: csv::Error },
    #[error("{table} line {line}: missing required field `{field}`")]
    MissingField {
        table: String,
        line: u64,
        field: String,
    },
    #[error("{table} line {line}: field `{field}` has invalid value {value:?}")]
    InvalidField {
        table: String,
        line: u64,
        field: String,
        value: String,
    },
}
