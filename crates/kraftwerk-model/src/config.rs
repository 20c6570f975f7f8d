//! Run descriptor: what to parse for each mode and which scripts to apply.
//!
//! [`UserInputs`] mirrors the JSON descriptor as written by users.
//! [`UserInputs::validate`] turns it into a [`RunConfig`], rejecting missing
//! mandatory fields and unknown data formats before any data file is touched.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::Constants;
use crate::error::ConfigError;

/// Raw encoding of a mode's data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataFormat {
    /// Flat XML export: one element per variable, no nesting.
    #[serde(rename = "XML")]
    FlatXml,
    /// XML export with arbitrarily nested loops.
    #[serde(rename = "LUNATIC_XML")]
    LunaticXml,
    /// JSON export of collected answers keyed by variable name.
    #[serde(rename = "LUNATIC_JSON")]
    LunaticJson,
    /// Delimited export of scanned paper questionnaires.
    #[serde(rename = "PAPER")]
    Paper,
}

impl DataFormat {
    pub const ALL: [DataFormat; 4] = [
        DataFormat::FlatXml,
        DataFormat::LunaticXml,
        DataFormat::LunaticJson,
        DataFormat::Paper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::FlatXml => "XML",
            DataFormat::LunaticXml => "LUNATIC_XML",
            DataFormat::LunaticJson => "LUNATIC_JSON",
            DataFormat::Paper => "PAPER",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        DataFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownDataFormat {
                value: s.to_string(),
                expected: DataFormat::ALL
                    .iter()
                    .map(DataFormat::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// One `survey_data` entry of the descriptor, as written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModeInputs {
    #[serde(default)]
    pub data_mode: Option<String>,
    #[serde(default)]
    pub data_format: Option<String>,
    #[serde(default)]
    pub data_file: Option<String>,
    #[serde(default)]
    pub metadata_file: Option<String>,
    #[serde(default)]
    pub paradata_folder: Option<String>,
    #[serde(default)]
    pub reporting_data_file: Option<String>,
    #[serde(default)]
    pub mode_specifications: Option<String>,
}

/// The run descriptor, as written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInputs {
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub survey_data: Vec<ModeInputs>,
    #[serde(default)]
    pub multimode_dataset_name: Option<String>,
    #[serde(default)]
    pub reconciliation_specifications: Option<String>,
    #[serde(default)]
    pub transformation_specifications: Option<String>,
    #[serde(default)]
    pub information_levels_specifications: Option<String>,
}

/// Validated settings of one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeConfig {
    pub mode: String,
    pub data_format: DataFormat,
    pub data_path: PathBuf,
    pub metadata_path: PathBuf,
    pub paradata_path: Option<PathBuf>,
    pub reporting_data_path: Option<PathBuf>,
    pub mode_script: Option<PathBuf>,
}

/// Validated settings of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub campaign: String,
    pub modes: Vec<ModeConfig>,
    pub multimode_dataset_name: String,
    pub reconciliation_script: Option<PathBuf>,
    pub transformation_script: Option<PathBuf>,
    pub information_levels_script: Option<PathBuf>,
    pub constants: Constants,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn resolve(base_dir: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn optional_path(base_dir: &Path, value: Option<&str>) -> Option<PathBuf> {
    non_empty(value).map(|v| resolve(base_dir, v))
}

/// Mode labels name bindings of the dataset store, next to the multimode
/// dataset and the `<mode>_keep` bindings of reconciliation. None of these
/// may share a name.
fn check_binding_names(
    modes: &[ModeConfig],
    multimode_dataset_name: &str,
    constants: &Constants,
) -> Result<(), ConfigError> {
    for mode in modes {
        if mode.mode == multimode_dataset_name {
            return Err(ConfigError::ReservedModeLabel {
                mode: mode.mode.clone(),
                used_as: "the multimode dataset".to_string(),
            });
        }
        if constants.keep_binding(&mode.mode) == multimode_dataset_name {
            return Err(ConfigError::ReservedModeLabel {
                mode: mode.mode.clone(),
                used_as: "the multimode dataset through its reconciliation binding".to_string(),
            });
        }
        if let Some(other) = modes
            .iter()
            .find(|other| constants.keep_binding(&other.mode) == mode.mode)
        {
            return Err(ConfigError::ReservedModeLabel {
                mode: mode.mode.clone(),
                used_as: format!("the reconciliation binding of mode '{}'", other.mode),
            });
        }
    }
    Ok(())
}

impl ModeInputs {
    fn validate(&self, index: usize, base_dir: &Path) -> Result<ModeConfig, ConfigError> {
        let required = |value: Option<&String>, field: &str| -> Result<String, ConfigError> {
            non_empty(value.map(String::as_str))
                .map(str::to_string)
                .ok_or_else(|| ConfigError::MissingModeField {
                    index,
                    field: field.to_string(),
                })
        };
        let mode = required(self.data_mode.as_ref(), "data_mode")?;
        let data_format: DataFormat = required(self.data_format.as_ref(), "data_format")?.parse()?;
        let data_file = required(self.data_file.as_ref(), "data_file")?;
        let metadata_file = required(self.metadata_file.as_ref(), "metadata_file")?;
        Ok(ModeConfig {
            mode,
            data_format,
            data_path: resolve(base_dir, &data_file),
            metadata_path: resolve(base_dir, &metadata_file),
            paradata_path: optional_path(base_dir, self.paradata_folder.as_deref()),
            reporting_data_path: optional_path(base_dir, self.reporting_data_file.as_deref()),
            mode_script: optional_path(base_dir, self.mode_specifications.as_deref()),
        })
    }
}

impl UserInputs {
    /// Check mandatory fields and resolve relative paths against `base_dir`
    /// (normally the descriptor's directory).
    pub fn validate(&self, base_dir: &Path) -> Result<RunConfig, ConfigError> {
        self.validate_with(base_dir, Constants::default())
    }

    pub fn validate_with(&self, base_dir: &Path, constants: Constants) -> Result<RunConfig, ConfigError> {
        let campaign = non_empty(self.campaign.as_deref())
            .ok_or_else(|| ConfigError::MissingField("campaign".to_string()))?
            .to_string();
        let multimode_dataset_name = non_empty(self.multimode_dataset_name.as_deref())
            .ok_or_else(|| ConfigError::MissingField("multimode_dataset_name".to_string()))?
            .to_string();
        if self.survey_data.is_empty() {
            return Err(ConfigError::NoModes);
        }
        let mut modes = Vec::with_capacity(self.survey_data.len());
        let mut seen = BTreeSet::new();
        for (index, inputs) in self.survey_data.iter().enumerate() {
            let mode = inputs.validate(index, base_dir)?;
            if !seen.insert(mode.mode.clone()) {
                return Err(ConfigError::DuplicateMode(mode.mode));
            }
            modes.push(mode);
        }
        check_binding_names(&modes, &multimode_dataset_name, &constants)?;
        Ok(RunConfig {
            campaign,
            modes,
            multimode_dataset_name,
            reconciliation_script: optional_path(
                base_dir,
                self.reconciliation_specifications.as_deref(),
            ),
            transformation_script: optional_path(
                base_dir,
                self.transformation_specifications.as_deref(),
            ),
            information_levels_script: optional_path(
                base_dir,
                self.information_levels_specifications.as_deref(),
            ),
            constants,
        })
    }
}
