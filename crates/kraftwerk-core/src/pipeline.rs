//! Run orchestration.
//!
//! A [`Pipeline`] is built from a validated [`RunConfig`]: every mode's
//! metadata is loaded up front, so configuration problems surface before any
//! data file is parsed. [`Pipeline::run`] then executes the steps in their
//! fixed order and never fails as a whole; problems are collected in the
//! outcome.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use kraftwerk_ingest::{FileAccess, load_variables_map};
use kraftwerk_model::{Constants, Issue, RunConfig, RunOutcome, VariablesMap};
use tracing::{info, info_span, warn};

use crate::bindings::BindingStore;
use crate::error::{PipelineError, Result};
use crate::steps::{self, Step};
use crate::vtl::VtlEngine;

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunResult {
    pub outcome: RunOutcome,
    pub store: BindingStore,
    /// Metadata of all modes merged, as used for the multimodal dataset.
    pub metadata: VariablesMap,
}

/// Mutable state threaded through the steps of one run.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub store: BindingStore,
    pub issues: Vec<Issue>,
    pub processed_files: Vec<PathBuf>,
}

impl RunState {
    pub fn record(&mut self, issue: Issue) {
        if issue.is_fatal() {
            warn!(kind = issue.kind.as_str(), "fatal: {issue}");
        } else {
            warn!(kind = issue.kind.as_str(), "{issue}");
        }
        self.issues.push(issue);
    }

    pub fn record_all(&mut self, issues: impl IntoIterator<Item = Issue>) {
        for issue in issues {
            self.record(issue);
        }
    }
}

pub struct Pipeline {
    pub(crate) config: RunConfig,
    pub(crate) files: Box<dyn FileAccess>,
    pub(crate) engine: Box<dyn VtlEngine>,
    pub(crate) metadata: BTreeMap<String, VariablesMap>,
    pub(crate) merged: VariablesMap,
}

impl Pipeline {
    /// Prepare a run: load and merge the metadata of every mode.
    pub fn new(
        config: RunConfig,
        files: Box<dyn FileAccess>,
        engine: Box<dyn VtlEngine>,
    ) -> Result<Self> {
        let mut metadata = BTreeMap::new();
        let mut merged = VariablesMap::new(&config.constants);
        for mode in &config.modes {
            let variables =
                load_variables_map(files.as_ref(), &mode.metadata_path, &config.constants)
                    .map_err(|source| PipelineError::Metadata {
                        mode: mode.mode.clone(),
                        source,
                    })?;
            merged
                .absorb(&variables)
                .map_err(|source| PipelineError::MetadataMerge {
                    mode: mode.mode.clone(),
                    source,
                })?;
            metadata.insert(mode.mode.clone(), variables);
        }
        Ok(Self {
            config,
            files,
            engine,
            metadata,
            merged,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn constants(&self) -> &Constants {
        &self.config.constants
    }

    /// Metadata of one mode.
    pub fn metadata(&self, mode: &str) -> Option<&VariablesMap> {
        self.metadata.get(mode)
    }

    pub fn merged_metadata(&self) -> &VariablesMap {
        &self.merged
    }

    /// Execute every step in order.
    pub fn run(self) -> RunResult {
        let _span = info_span!("pipeline", campaign = %self.config.campaign).entered();
        let start = Instant::now();
        let mut state = RunState::default();

        for step in Step::ALL {
            let _step_span = info_span!("step", step = step.name()).entered();
            let step_start = Instant::now();
            steps::execute(step, &self, &mut state);
            info!(
                step = step.name(),
                bindings = state.store.len(),
                duration_ms = step_start.elapsed().as_millis(),
                "step complete"
            );
        }

        let outcome = RunOutcome {
            row_counts: state.store.row_counts(),
            processed_files: state.processed_files,
            issues: state.issues,
        };
        info!(
            tables = outcome.row_counts.len(),
            issues = outcome.issues.len(),
            duration_ms = start.elapsed().as_millis(),
            "pipeline complete"
        );
        RunResult {
            outcome,
            store: state.store,
            metadata: self.merged,
        }
    }
}
