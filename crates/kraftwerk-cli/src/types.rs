use std::path::PathBuf;

use kraftwerk_model::{DataFormat, RunOutcome};

#[derive(Debug)]
pub struct RunReport {
    pub campaign: String,
    /// Folder the tables were written to; `None` on a dry run.
    pub output_dir: Option<PathBuf>,
    pub outcome: RunOutcome,
    pub written: Vec<PathBuf>,
}

impl RunReport {
    pub fn has_errors(&self) -> bool {
        !self.outcome.is_success()
    }
}

#[derive(Debug)]
pub struct CheckReport {
    pub campaign: String,
    pub multimode_dataset_name: String,
    pub modes: Vec<ModeSummary>,
    /// Scripts named by the descriptor that do not exist.
    pub missing_scripts: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct ModeSummary {
    pub mode: String,
    pub data_format: DataFormat,
    pub data_files: usize,
    pub groups: usize,
    pub variables: usize,
}
