use kraftwerk_ingest::IngestError;
use thiserror::Error;

/// Errors that prevent a pipeline from being set up.
///
/// Once a run has started, problems are recorded as issues in the run outcome
/// instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("metadata of mode '{mode}' cannot be loaded: {source}")]
    Metadata {
        mode: String,
        #[source]
        source: IngestError,
    },
    #[error("metadata of mode '{mode}' conflicts with other modes: {source}")]
    MetadataMerge {
        mode: String,
        #[source]
        source: kraftwerk_model::ModelError,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
