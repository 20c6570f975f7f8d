use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::issue::Issue;

/// What a run produced, for the calling layer to turn into a job status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Row count of every binding left at the end of the run.
    pub row_counts: BTreeMap<String, usize>,
    /// Data files that were parsed successfully.
    pub processed_files: Vec<PathBuf>,
    /// Every issue recorded, in order of occurrence.
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus<'a> {
    Success { warnings: usize },
    Failure(&'a Issue),
}

impl RunOutcome {
    pub fn first_fatal(&self) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.is_fatal())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| !issue.is_fatal())
    }

    pub fn is_success(&self) -> bool {
        self.first_fatal().is_none()
    }

    pub fn status(&self) -> RunStatus<'_> {
        match self.first_fatal() {
            Some(issue) => RunStatus::Failure(issue),
            None => RunStatus::Success {
                warnings: self.warnings().count(),
            },
        }
    }
}
