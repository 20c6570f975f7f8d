//! Per-mode parsing, conversion and binding.

use std::time::Instant;

use kraftwerk_ingest::parser_for;
use kraftwerk_model::{Constants, Issue, IssueKind, ModeConfig, SurveyRawData, VariablesMap};
use polars::prelude::{DataFrame, NamedFrom, PolarsResult, Series};
use tracing::{debug, info, info_span};

use crate::dataset::to_dataset;
use crate::pipeline::{Pipeline, RunState};
use crate::values::{cell_string, is_ticked};
use crate::vtl::run_script;

/// Process every mode. A mode whose dataset cannot be built is reported and
/// left unbound; the following modes still run.
pub(crate) fn run(pipeline: &Pipeline, state: &mut RunState) -> PolarsResult<()> {
    for mode in &pipeline.config.modes {
        let _span = info_span!("mode", mode = %mode.mode, format = %mode.data_format).entered();
        let start = Instant::now();
        if let Err(err) = process_mode(pipeline, mode, state) {
            state.store.remove(&mode.mode);
            state.record(
                Issue::fatal(
                    IssueKind::MissingDataset,
                    format!("dataset of mode could not be built: {err}"),
                )
                .with_mode(mode.mode.as_str()),
            );
            continue;
        }
        debug!(duration_ms = start.elapsed().as_millis(), "mode processed");
    }
    Ok(())
}

fn process_mode(pipeline: &Pipeline, mode: &ModeConfig, state: &mut RunState) -> PolarsResult<()> {
    let constants = &pipeline.config.constants;
    let Some(variables) = pipeline.metadata.get(&mode.mode) else {
        state.record(
            Issue::fatal(IssueKind::Configuration, "no metadata loaded for mode")
                .with_mode(mode.mode.as_str()),
        );
        return Ok(());
    };

    let mut data = SurveyRawData::new(
        mode.mode.as_str(),
        vec![mode.data_path.clone()],
        variables.clone(),
    );
    let parser = parser_for(mode.data_format, constants);
    match parser.parse_survey_data(&mut data, pipeline.files.as_ref()) {
        Ok(report) => {
            state.processed_files.extend(report.files);
            state.record_all(
                report
                    .issues
                    .into_iter()
                    .map(|issue| issue.with_mode(mode.mode.as_str())),
            );
        }
        Err(err) => {
            state.record(
                Issue::fatal(IssueKind::Io, err.to_string())
                    .with_mode(mode.mode.as_str())
                    .with_file(mode.data_path.as_path()),
            );
            return Ok(());
        }
    }

    let conversion = to_dataset(&data, constants)?;
    state.record_all(conversion.issues);
    let mut frame = conversion.frame;
    let rebuilt = reconstruct_ucq_questions(&mut frame, variables, constants)?;
    if !rebuilt.is_empty() {
        debug!(questions = ?rebuilt, "unique-choice questions rebuilt from flags");
    }
    info!(
        questionnaires = data.len(),
        rows = frame.height(),
        columns = frame.width(),
        "mode dataset bound"
    );
    state.store.put(mode.mode.as_str(), frame);

    let issues = run_script(
        pipeline.engine.as_ref(),
        pipeline.files.as_ref(),
        mode.mode_script.as_deref(),
        &mut state.store,
    );
    state.record_all(
        issues
            .into_iter()
            .map(|issue| issue.with_mode(mode.mode.as_str())),
    );
    Ok(())
}

/// Add one column per unique-choice question encoded by paper flags.
///
/// The question takes the modality of its first ticked flag, or null when no
/// flag is ticked. Questions that already have a column are left alone.
/// Returns the names of the columns added.
pub fn reconstruct_ucq_questions(
    frame: &mut DataFrame,
    variables: &VariablesMap,
    constants: &Constants,
) -> PolarsResult<Vec<String>> {
    let mut added = Vec::new();
    for ((group_name, question), flags) in variables.ucq_questions() {
        let mut column_name = String::new();
        for group in variables.group_chain(group_name) {
            column_name.push_str(group);
            column_name.push(constants.qualified_separator);
        }
        column_name.push_str(question);
        if frame.column(&column_name).is_ok() {
            continue;
        }

        let flag_columns: Vec<(String, &str)> = flags
            .iter()
            .filter_map(|flag| {
                let qualified = variables.qualified_name(flag);
                let modality = flag.paper_ucq.as_ref()?.value.as_str();
                frame.column(&qualified).is_ok().then_some((qualified, modality))
            })
            .collect();

        let values: Vec<Option<&str>> = (0..frame.height())
            .map(|idx| {
                flag_columns
                    .iter()
                    .find(|(column, _)| {
                        cell_string(frame, column, idx).is_some_and(|value| is_ticked(&value))
                    })
                    .map(|(_, modality)| *modality)
            })
            .collect();
        frame.with_column(Series::new(column_name.as_str().into(), values))?;
        added.push(column_name);
    }
    Ok(added)
}
