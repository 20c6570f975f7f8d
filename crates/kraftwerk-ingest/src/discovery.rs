//! Expansion of a mode's data location into the files to parse.

use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};
use crate::files::FileAccess;

/// Files to parse for a data location.
///
/// A file is returned as is. A folder yields its regular files (hidden files
/// excluded), sorted by file name so that runs are reproducible.
pub fn list_data_files(files: &dyn FileAccess, location: &Path) -> Result<Vec<PathBuf>> {
    if !files.exists(location) {
        return Err(IngestError::FileNotFound {
            path: location.to_path_buf(),
        });
    }
    if !files.is_dir(location) {
        return Ok(vec![location.to_path_buf()]);
    }

    let entries = files
        .list(location)
        .map_err(|source| IngestError::DirectoryRead {
            path: location.to_path_buf(),
            source,
        })?;

    let mut found: Vec<PathBuf> = entries
        .into_iter()
        .filter(|path| !files.is_dir(path))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| !name.starts_with('.'))
        })
        .collect();
    found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(found)
}
