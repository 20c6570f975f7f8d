//! Processing steps of a run, in execution order.
//!
//! 1. **Unimodal** - parse, convert and bind each mode, then run its script
//! 2. **Reconciliation** - stack the modes into the multimodal dataset
//! 3. **CleanUp** - drop paper flag columns and the per-mode bindings
//! 4. **MultimodeTransformations** - run the transformation script
//! 5. **InformationLevels** - split the multimodal dataset per group

mod cleanup;
mod information_levels;
mod reconciliation;
mod unimodal;

use std::fmt;

use kraftwerk_model::{Issue, IssueKind};
use polars::prelude::PolarsResult;

use crate::pipeline::{Pipeline, RunState};
use crate::vtl::run_script;

pub use information_levels::split_information_levels;
pub use reconciliation::union_frames;
pub use unimodal::reconstruct_ucq_questions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Unimodal,
    Reconciliation,
    CleanUp,
    MultimodeTransformations,
    InformationLevels,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Unimodal,
        Step::Reconciliation,
        Step::CleanUp,
        Step::MultimodeTransformations,
        Step::InformationLevels,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Step::Unimodal => "unimodal",
            Step::Reconciliation => "reconciliation",
            Step::CleanUp => "clean_up",
            Step::MultimodeTransformations => "multimode_transformations",
            Step::InformationLevels => "information_levels",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn execute(step: Step, pipeline: &Pipeline, state: &mut RunState) {
    let result = match step {
        Step::Unimodal => unimodal::run(pipeline, state),
        Step::Reconciliation => reconciliation::run(pipeline, state),
        Step::CleanUp => cleanup::run(pipeline, state),
        Step::MultimodeTransformations => multimode_transformations(pipeline, state),
        Step::InformationLevels => information_levels::run(pipeline, state),
    };
    if let Err(err) = result {
        state.record(Issue::fatal(
            IssueKind::MissingDataset,
            format!("step {step} failed: {err}"),
        ));
    }
}

/// Whether the multimodal dataset is bound; records a fatal issue if not.
pub(crate) fn require_multimode(step: Step, pipeline: &Pipeline, state: &mut RunState) -> bool {
    let name = &pipeline.config.multimode_dataset_name;
    if state.store.contains(name) {
        return true;
    }
    state.record(Issue::fatal(
        IssueKind::MissingDataset,
        format!("step {step} skipped: dataset {name} is not bound"),
    ));
    false
}

fn multimode_transformations(pipeline: &Pipeline, state: &mut RunState) -> PolarsResult<()> {
    if !require_multimode(Step::MultimodeTransformations, pipeline, state) {
        return Ok(());
    }
    let issues = run_script(
        pipeline.engine.as_ref(),
        pipeline.files.as_ref(),
        pipeline.config.transformation_script.as_deref(),
        &mut state.store,
    );
    state.record_all(issues);
    Ok(())
}
