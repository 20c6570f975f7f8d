//! Output of a finished run.
//!
//! - **Tables**: one `;`-separated CSV file per bound dataset
//! - **Descriptions**: column types and lengths, consumed by external
//!   SAS/R import-script generators

mod description;
mod error;
mod writer;

pub use description::{ColumnDescription, TableDescription, describe_table};
pub use error::{ReportError, Result};
pub use writer::{CSV_SEPARATOR, output_file_name, write_csv_tables, write_descriptions};
