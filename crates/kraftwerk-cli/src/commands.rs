use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, info_span};

use kraftwerk_core::{Pipeline, UnavailableVtlEngine};
use kraftwerk_ingest::{FileAccess, LocalFileAccess, list_data_files, load_user_inputs};
use kraftwerk_model::{Constants, RunConfig, VariablesMap};
use kraftwerk_report::{write_csv_tables, write_descriptions};

use crate::types::{CheckReport, ModeSummary, RunReport};

/// chrono format of the per-run output folder name.
pub const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

fn load_config(path: &Path) -> Result<RunConfig> {
    load_user_inputs(&LocalFileAccess, path, Constants::default())
        .with_context(|| format!("load run descriptor {}", path.display()))
}

fn default_output_root(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|dir| dir.join("output"))
        .unwrap_or_else(|| PathBuf::from("output"))
}

/// Execute a full run and write its tables under
/// `<output_root>/<timestamp>`, unless `dry_run` is set.
pub fn run_campaign(
    config_path: &Path,
    output_root: Option<&Path>,
    dry_run: bool,
) -> Result<RunReport> {
    let config = load_config(config_path)?;
    let campaign = config.campaign.clone();
    let _span = info_span!("campaign", campaign = %campaign).entered();
    let start = Instant::now();

    let pipeline = Pipeline::new(
        config,
        Box::new(LocalFileAccess),
        Box::new(UnavailableVtlEngine),
    )
    .context("prepare run")?;
    let constants = pipeline.constants().clone();
    let result = pipeline.run();

    let mut report = RunReport {
        campaign,
        output_dir: None,
        outcome: result.outcome,
        written: Vec::new(),
    };
    if dry_run {
        info!("dry run, no output written");
        return Ok(report);
    }

    let root = output_root
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_root(config_path));
    let output_dir = root.join(Local::now().format(TIMESTAMP_FORMAT).to_string());
    let files = LocalFileAccess;
    let mut written = write_csv_tables(&result.store, &files, &output_dir, &report.campaign)
        .with_context(|| format!("write tables to {}", output_dir.display()))?;
    written.extend(
        write_descriptions(
            &result.store,
            &result.metadata,
            &constants,
            &files,
            &output_dir,
            &report.campaign,
        )
        .with_context(|| format!("write table descriptions to {}", output_dir.display()))?,
    );
    info!(
        files = written.len(),
        output_dir = %output_dir.display(),
        duration_ms = start.elapsed().as_millis(),
        "run complete"
    );
    report.output_dir = Some(output_dir);
    report.written = written;
    Ok(report)
}

/// Validate a descriptor, its metadata and the presence of its inputs.
pub fn check_campaign(config_path: &Path) -> Result<CheckReport> {
    let config = load_config(config_path)?;
    let files = LocalFileAccess;

    let mut missing_scripts = Vec::new();
    let scripts = config
        .modes
        .iter()
        .filter_map(|mode| mode.mode_script.as_ref())
        .chain(config.reconciliation_script.as_ref())
        .chain(config.transformation_script.as_ref())
        .chain(config.information_levels_script.as_ref());
    for script in scripts {
        if !files.exists(script) {
            missing_scripts.push(script.clone());
        }
    }

    let mut data_files = Vec::with_capacity(config.modes.len());
    for mode in &config.modes {
        let found = list_data_files(&files, &mode.data_path)
            .with_context(|| format!("list data files of mode {}", mode.mode))?;
        data_files.push(found.len());
    }

    let campaign = config.campaign.clone();
    let multimode_dataset_name = config.multimode_dataset_name.clone();
    let pipeline = Pipeline::new(
        config,
        Box::new(LocalFileAccess),
        Box::new(UnavailableVtlEngine),
    )
    .context("load metadata")?;

    let modes = pipeline
        .config()
        .modes
        .iter()
        .zip(data_files)
        .map(|(mode, data_files)| {
            let metadata = pipeline.metadata(&mode.mode);
            ModeSummary {
                mode: mode.mode.clone(),
                data_format: mode.data_format,
                data_files,
                groups: metadata.map_or(0, |map| map.groups().count()),
                variables: metadata.map_or(0, VariablesMap::len),
            }
        })
        .collect();

    Ok(CheckReport {
        campaign,
        multimode_dataset_name,
        modes,
        missing_scripts,
    })
}
