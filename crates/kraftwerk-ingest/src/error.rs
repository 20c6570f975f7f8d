//! Error types for survey data ingestion.

use std::path::PathBuf;

use kraftwerk_model::{ConfigError, ModelError};
use thiserror::Error;

/// Errors that stop the ingestion of a whole file or mode.
///
/// Problems limited to one respondent are not errors: they are recorded as
/// issues in the parse report and parsing goes on.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// File or folder does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to open or read a file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Format Errors ===
    /// The XML document is not well formed.
    #[error("malformed XML in {path} at byte {position}: {source}")]
    Xml {
        path: PathBuf,
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// The JSON document cannot be parsed.
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The delimited file cannot be read.
    #[error("failed to read delimited file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The document does not have the expected overall shape.
    #[error("unexpected layout in {path}: {reason}")]
    Layout { path: PathBuf, reason: String },

    // === Metadata and descriptor Errors ===
    /// Metadata describes an invalid questionnaire.
    #[error("invalid metadata in {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    /// Run descriptor is invalid.
    #[error("invalid run descriptor {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}

impl IngestError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound { path }
        } else {
            Self::FileRead { path, source }
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::FileNotFound {
            path: PathBuf::from("/path/to/data.xml"),
        };
        assert_eq!(err.to_string(), "file not found: /path/to/data.xml");
    }

    #[test]
    fn test_not_found_io_error_maps_to_file_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(
            IngestError::read("/x", io),
            IngestError::FileNotFound { .. }
        ));
    }
}
