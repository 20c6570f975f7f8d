//! Files written at the end of a run.

use std::io::Write;
use std::path::{Path, PathBuf};

use kraftwerk_core::BindingStore;
use kraftwerk_ingest::FileAccess;
use kraftwerk_model::{Constants, VariablesMap};
use polars::prelude::{CsvWriter, SerWriter};
use tracing::{debug, info};

use crate::description::describe_table;
use crate::error::{ReportError, Result};

/// Field separator of exported tables.
pub const CSV_SEPARATOR: u8 = b';';

/// Output file of a table: `<campaign>_<table>.<extension>`.
pub fn output_file_name(campaign: &str, table: &str, suffix: &str) -> String {
    format!("{campaign}_{table}{suffix}")
}

/// Write every bound table as a `;`-separated CSV file.
pub fn write_csv_tables(
    store: &BindingStore,
    files: &dyn FileAccess,
    dir: &Path,
    campaign: &str,
) -> Result<Vec<PathBuf>> {
    files.create_dir_all(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(store.len());
    for (name, frame) in store.iter() {
        let path = dir.join(output_file_name(campaign, name, ".csv"));
        let mut writer = files.create(&path).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        let mut frame = frame.clone();
        CsvWriter::new(&mut writer)
            .include_header(true)
            .with_separator(CSV_SEPARATOR)
            .finish(&mut frame)
            .map_err(|source| ReportError::Polars {
                table: name.to_string(),
                source,
            })?;
        writer.flush().map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(table = name, rows = frame.height(), path = %path.display(), "table written");
        written.push(path);
    }
    info!(tables = written.len(), dir = %dir.display(), "CSV tables written");
    Ok(written)
}

/// Write the description of every bound table as JSON.
pub fn write_descriptions(
    store: &BindingStore,
    metadata: &VariablesMap,
    constants: &Constants,
    files: &dyn FileAccess,
    dir: &Path,
    campaign: &str,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(store.len());
    for (name, frame) in store.iter() {
        let description = describe_table(name, frame, metadata, constants);
        let path = dir.join(output_file_name(campaign, name, "_description.json"));
        let content =
            serde_json::to_vec_pretty(&description).map_err(|source| ReportError::Json {
                table: name.to_string(),
                source,
            })?;
        let io_error = |source| ReportError::Io {
            path: path.clone(),
            source,
        };
        let mut writer = files.create(&path).map_err(io_error)?;
        writer.write_all(&content).map_err(io_error)?;
        writer.flush().map_err(io_error)?;
        written.push(path);
    }
    Ok(written)
}
