//! Survey data ingestion.
//!
//! This crate reads everything a run needs from storage:
//!
//! - **File access**: the [`FileAccess`] abstraction and its local implementation
//! - **Discovery**: expansion of a data location into the files to parse
//! - **Metadata**: questionnaire metadata and run descriptors
//! - **Parsers**: one [`DataParser`] per raw encoding, selected by [`parser_for`]
//!
//! # Example
//!
//! ```ignore
//! use kraftwerk_ingest::{LocalFileAccess, load_variables_map, parser_for};
//!
//! let files = LocalFileAccess;
//! let variables = load_variables_map(&files, mode.metadata_path.as_path(), &constants)?;
//! let mut data = SurveyRawData::new(&mode.mode, vec![mode.data_path.clone()], variables);
//! let report = parser_for(mode.data_format, &constants).parse_survey_data(&mut data, &files)?;
//! ```

mod discovery;
mod error;
mod files;
mod metadata;
mod parser;

// === Error Types ===
pub use error::{IngestError, Result};

// === File Access ===
pub use discovery::list_data_files;
pub use files::{FileAccess, LocalFileAccess};

// === Metadata ===
pub use metadata::{load_user_inputs, load_variables_map};

// === Parsers ===
pub use parser::{
    DataParser, FlatXmlParser, LunaticJsonParser, LunaticXmlParser, PaperParser, ParseReport,
    parser_for,
};
