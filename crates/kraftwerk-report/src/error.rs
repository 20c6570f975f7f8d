use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to export table {table}: {source}")]
    Polars {
        table: String,
        #[source]
        source: polars::prelude::PolarsError,
    },
    #[error("failed to serialize description of {table}: {source}")]
    Json {
        table: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ReportError>;
