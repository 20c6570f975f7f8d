//! Split of the multimodal dataset into one table per information level.
//!
//! The root level holds one row per respondent with the root variables. Each
//! group level holds one row per group instance: the respondent identifier,
//! the identifiers of the group and its ancestors, and the group's own
//! variables with their group prefix removed.

use std::collections::{BTreeMap, BTreeSet};

use kraftwerk_model::{Constants, VariablesMap};
use polars::prelude::{BooleanChunked, DataFrame, NewChunkedArray, PolarsResult};
use tracing::debug;

use super::{Step, require_multimode};
use crate::pipeline::{Pipeline, RunState};
use crate::values::cell_string;
use crate::vtl::run_script;

pub(crate) fn run(pipeline: &Pipeline, state: &mut RunState) -> PolarsResult<()> {
    if !require_multimode(Step::InformationLevels, pipeline, state) {
        return Ok(());
    }
    let config = &pipeline.config;
    let levels = match state.store.get(&config.multimode_dataset_name) {
        Some(frame) => split_information_levels(frame, &pipeline.merged, &config.constants)?,
        None => Vec::new(),
    };
    for (name, table) in levels {
        debug!(level = %name, rows = table.height(), "information level bound");
        state.store.put(name, table);
    }

    let issues = run_script(
        pipeline.engine.as_ref(),
        pipeline.files.as_ref(),
        config.information_levels_script.as_deref(),
        &mut state.store,
    );
    state.record_all(issues);
    Ok(())
}

/// Keep the first row of each distinct key, dropping rows whose last key
/// column is null.
fn distinct_rows(table: &DataFrame, keys: &[String]) -> PolarsResult<DataFrame> {
    let mut seen = BTreeSet::new();
    let mut keep = Vec::with_capacity(table.height());
    for idx in 0..table.height() {
        let values: Vec<Option<String>> =
            keys.iter().map(|key| cell_string(table, key, idx)).collect();
        if values.last().is_none_or(Option::is_none) {
            keep.push(false);
            continue;
        }
        keep.push(seen.insert(values));
    }
    let mask = BooleanChunked::from_slice("distinct".into(), &keep);
    table.filter(&mask)
}

/// One table per information level, root level first, then groups by depth.
pub fn split_information_levels(
    frame: &DataFrame,
    metadata: &VariablesMap,
    constants: &Constants,
) -> PolarsResult<Vec<(String, DataFrame)>> {
    let separator = constants.qualified_separator;
    let identifier = constants.root_identifier_name.as_str();
    let groups = metadata.groups_by_depth();

    let prefixes: BTreeMap<String, &str> = groups
        .iter()
        .map(|group| {
            let chain = metadata.group_chain(&group.name);
            (chain.join(separator.to_string().as_str()), group.name.as_str())
        })
        .collect();
    let group_names: BTreeSet<&str> = groups.iter().map(|group| group.name.as_str()).collect();

    let mut root_columns = vec![identifier.to_string()];
    // group name -> (qualified column, own name)
    let mut own_columns: BTreeMap<&str, Vec<(String, String)>> = BTreeMap::new();
    for name in frame.get_column_names_owned() {
        let name = name.to_string();
        if name == identifier || group_names.contains(name.as_str()) {
            continue;
        }
        let owner = name
            .rsplit_once(separator)
            .and_then(|(prefix, own)| prefixes.get(prefix).map(|group| (*group, own)));
        match owner {
            Some((group, own)) => {
                let own = own.to_string();
                own_columns.entry(group).or_default().push((name, own));
            }
            None => root_columns.push(name),
        }
    }

    let mut levels = Vec::with_capacity(groups.len() + 1);
    let root = distinct_rows(&frame.select(root_columns)?, &[identifier.to_string()])?;
    levels.push((metadata.root_group_name().to_string(), root));

    for group in groups {
        if frame.column(&group.name).is_err() {
            debug!(group = %group.name, "no identifier column, level skipped");
            continue;
        }
        let mut keys = vec![identifier.to_string()];
        keys.extend(
            metadata
                .group_chain(&group.name)
                .into_iter()
                .map(str::to_string),
        );
        let own = own_columns.remove(group.name.as_str()).unwrap_or_default();
        let mut columns = keys.clone();
        columns.extend(own.iter().map(|(qualified, _)| qualified.clone()));

        let mut table = distinct_rows(&frame.select(columns)?, &keys)?;
        for (qualified, short) in own {
            table.rename(&qualified, short.into())?;
        }
        levels.push((group.name.clone(), table));
    }
    Ok(levels)
}
