//! Loading of questionnaire metadata and run descriptors.
//!
//! Metadata files are the JSON documents produced by the external DDI
//! transform:
//!
//! ```json
//! {
//!   "groups": [{"name": "PERSONS", "parent": "RACINE"}],
//!   "variables": [{"name": "AGE", "group": "PERSONS", "type": "INTEGER", "length": "3"}]
//! }
//! ```

use std::path::{Path, PathBuf};

use kraftwerk_model::{Constants, Group, RunConfig, UserInputs, Variable, VariablesMap};
use serde::Deserialize;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::files::FileAccess;

#[derive(Debug, Deserialize)]
struct MetadataDocument {
    #[serde(default)]
    groups: Vec<Group>,
    #[serde(default)]
    variables: Vec<Variable>,
}

/// Read and validate the metadata of one mode.
pub fn load_variables_map(
    files: &dyn FileAccess,
    path: &Path,
    constants: &Constants,
) -> Result<VariablesMap> {
    let content = files
        .read_to_string(path)
        .map_err(|source| IngestError::read(path, source))?;
    let document: MetadataDocument =
        serde_json::from_str(&content).map_err(|source| IngestError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let map = VariablesMap::build(constants, document.groups, document.variables).map_err(
        |source| IngestError::Metadata {
            path: path.to_path_buf(),
            source,
        },
    )?;
    debug!(
        path = %path.display(),
        variables = map.len(),
        "loaded metadata"
    );
    Ok(map)
}

/// Read a run descriptor and validate it. Relative paths inside the
/// descriptor are resolved against the descriptor's folder.
pub fn load_user_inputs(
    files: &dyn FileAccess,
    path: &Path,
    constants: Constants,
) -> Result<RunConfig> {
    let content = files
        .read_to_string(path)
        .map_err(|source| IngestError::read(path, source))?;
    let inputs: UserInputs =
        serde_json::from_str(&content).map_err(|source| IngestError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(PathBuf::new);
    inputs
        .validate_with(&base_dir, constants)
        .map_err(|source| IngestError::Config {
            path: path.to_path_buf(),
            source,
        })
}
