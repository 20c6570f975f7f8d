//! Removal of intermediate data once the multimodal dataset exists.

use std::collections::BTreeSet;

use polars::prelude::PolarsResult;
use tracing::debug;

use super::{Step, require_multimode};
use crate::pipeline::{Pipeline, RunState};

pub(crate) fn run(pipeline: &Pipeline, state: &mut RunState) -> PolarsResult<()> {
    let config = &pipeline.config;

    if require_multimode(Step::CleanUp, pipeline, state) {
        let flags: BTreeSet<String> = pipeline
            .metadata
            .values()
            .flat_map(|variables| {
                variables
                    .ucq_flags()
                    .map(|flag| variables.qualified_name(flag))
            })
            .collect();
        if let Some(frame) = state.store.get_mut(&config.multimode_dataset_name) {
            let keep: Vec<String> = frame
                .get_column_names_owned()
                .into_iter()
                .map(|name| name.to_string())
                .filter(|name| !flags.contains(name))
                .collect();
            let dropped = frame.width() - keep.len();
            if dropped > 0 {
                *frame = frame.select(keep)?;
                debug!(dropped, "paper flag columns removed");
            }
        }
    }

    for mode in &config.modes {
        state.store.remove(&mode.mode);
        state.store.remove(&config.constants.keep_binding(&mode.mode));
    }
    Ok(())
}
