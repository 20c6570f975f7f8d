//! Stacking of the mode datasets into the multimodal dataset.

use std::collections::BTreeMap;

use kraftwerk_model::{Issue, IssueKind};
use polars::prelude::{Column, DataFrame, DataType, PolarsResult};
use tracing::info;

use crate::pipeline::{Pipeline, RunState};
use crate::vtl::run_script;

pub(crate) fn run(pipeline: &Pipeline, state: &mut RunState) -> PolarsResult<()> {
    let config = &pipeline.config;
    let constants = &config.constants;

    let mut keeps = Vec::new();
    for mode in &config.modes {
        let Some(frame) = state.store.get(&mode.mode) else {
            continue;
        };
        let mut keep = frame.clone();
        let height = keep.height();
        keep.with_column(Column::new(
            constants.mode_variable_name.as_str().into(),
            vec![mode.mode.as_str(); height],
        ))?;
        keeps.push(keep.clone());
        state.store.put(constants.keep_binding(&mode.mode), keep);
    }

    if keeps.is_empty() {
        state.record(Issue::fatal(
            IssueKind::MissingDataset,
            format!(
                "no mode dataset available to build {}",
                config.multimode_dataset_name
            ),
        ));
        return Ok(());
    }

    let multimode = union_frames(&keeps)?;
    info!(
        modes = keeps.len(),
        rows = multimode.height(),
        columns = multimode.width(),
        "multimodal dataset built"
    );
    state
        .store
        .put(config.multimode_dataset_name.as_str(), multimode);

    let issues = run_script(
        pipeline.engine.as_ref(),
        pipeline.files.as_ref(),
        config.reconciliation_script.as_deref(),
        &mut state.store,
    );
    state.record_all(issues);
    Ok(())
}

/// Stack datasets whose columns may differ.
///
/// Columns keep the order of their first appearance. A column missing from a
/// dataset is null on its rows; a column whose type differs between datasets
/// becomes a string column.
pub fn union_frames(frames: &[DataFrame]) -> PolarsResult<DataFrame> {
    let mut order: Vec<String> = Vec::new();
    let mut types: BTreeMap<String, DataType> = BTreeMap::new();
    for frame in frames {
        for column in frame.get_columns() {
            let name = column.name().to_string();
            let dtype = column.dtype();
            match types.get_mut(&name) {
                None => {
                    order.push(name.clone());
                    types.insert(name, dtype.clone());
                }
                Some(existing) if *existing == DataType::Null => *existing = dtype.clone(),
                Some(existing) if existing != dtype && *dtype != DataType::Null => {
                    *existing = DataType::String;
                }
                Some(_) => {}
            }
        }
    }

    let mut union: Option<DataFrame> = None;
    for frame in frames {
        let mut columns = Vec::with_capacity(order.len());
        for name in &order {
            let target = &types[name];
            let column = match frame.column(name) {
                Ok(column) if column.dtype() == target => column.clone(),
                Ok(column) => column.cast(target)?,
                Err(_) => Column::full_null(name.as_str().into(), frame.height(), target),
            };
            columns.push(column);
        }
        let aligned = DataFrame::new(columns)?;
        match union.as_mut() {
            Some(stacked) => {
                stacked.vstack_mut(&aligned)?;
            }
            None => union = Some(aligned),
        }
    }
    Ok(union.unwrap_or_default())
}
