//! Survey post-processing pipeline.
//!
//! Raw data of each collection mode is converted into a dataset, the modes
//! are reconciled into one multimodal dataset, which is cleaned, transformed
//! by user scripts and finally split per information level.
//!
//! # Example
//!
//! ```ignore
//! use kraftwerk_core::{Pipeline, UnavailableVtlEngine};
//! use kraftwerk_ingest::LocalFileAccess;
//!
//! let pipeline = Pipeline::new(config, Box::new(LocalFileAccess), Box::new(UnavailableVtlEngine))?;
//! let result = pipeline.run();
//! for (table, rows) in &result.outcome.row_counts {
//!     println!("{table}: {rows}");
//! }
//! ```

pub mod bindings;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod steps;
pub mod values;
pub mod vtl;

pub use bindings::BindingStore;
pub use dataset::{DatasetConversion, dataset_columns, to_dataset};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, RunResult};
pub use steps::{Step, reconstruct_ucq_questions, split_information_levels, union_frames};
pub use vtl::{UnavailableVtlEngine, VtlEngine, VtlError, run_script};
