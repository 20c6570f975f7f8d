//! Runs driven through the command layer, on a single-mode campaign.

use std::fs;
use std::path::{Path, PathBuf};

use kraftwerk_cli::commands::{check_campaign, run_campaign};
use kraftwerk_model::DataFormat;
use tempfile::TempDir;

const METADATA: &str = r#"{
    "groups": [{"name": "PERSONS", "parent": "RACINE"}],
    "variables": [
        {"name": "AGE", "group": "RACINE", "type": "INTEGER"},
        {"name": "PRENOM", "group": "PERSONS", "type": "STRING"}
    ]
}"#;

const DATA: &str = r#"[
    {"id": "U1", "data": {"COLLECTED": {
        "AGE": {"COLLECTED": 30},
        "PRENOM": {"COLLECTED": ["Ann", "Bob"]}
    }}},
    {"id": "U2", "data": {"COLLECTED": {"AGE": {"COLLECTED": 52}}}}
]"#;

fn campaign(dir: &Path, extra: &str) -> PathBuf {
    fs::write(dir.join("meta.json"), METADATA).unwrap();
    fs::write(dir.join("cawi.json"), DATA).unwrap();
    let descriptor = dir.join("descriptor.json");
    fs::write(
        &descriptor,
        format!(
            r#"{{
                "campaign": "SURVEY",
                "survey_data": [{{
                    "data_mode": "CAWI",
                    "data_format": "LUNATIC_JSON",
                    "data_file": "cawi.json",
                    "metadata_file": "meta.json"
                }}],
                "multimode_dataset_name": "MULTIMODE"{extra}
            }}"#
        ),
    )
    .unwrap();
    descriptor
}

#[test]
fn run_writes_tables_into_a_timestamped_folder() {
    let dir = TempDir::new().unwrap();
    let descriptor = campaign(dir.path(), "");
    let out = dir.path().join("out");

    let report = run_campaign(&descriptor, Some(&out), false).unwrap();

    assert!(!report.has_errors());
    assert_eq!(report.campaign, "SURVEY");
    assert_eq!(report.outcome.row_counts.get("RACINE"), Some(&2));
    assert_eq!(report.outcome.row_counts.get("PERSONS"), Some(&2));
    let output_dir = report.output_dir.unwrap();
    assert_eq!(output_dir.parent(), Some(out.as_path()));
    let racine = output_dir.join("SURVEY_RACINE.csv");
    assert!(report.written.contains(&racine));
    let content = fs::read_to_string(racine).unwrap();
    assert!(content.starts_with("IdUE;"));
    assert!(output_dir.join("SURVEY_PERSONS_description.json").exists());
}

#[test]
fn dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let descriptor = campaign(dir.path(), "");
    let out = dir.path().join("out");

    let report = run_campaign(&descriptor, Some(&out), true).unwrap();

    assert!(report.output_dir.is_none());
    assert!(report.written.is_empty());
    assert!(report.outcome.row_counts.contains_key("MULTIMODE"));
    assert!(!out.exists());
}

#[test]
fn missing_data_file_fails_the_run_but_still_reports() {
    let dir = TempDir::new().unwrap();
    let descriptor = campaign(dir.path(), "");
    fs::remove_file(dir.path().join("cawi.json")).unwrap();

    let report = run_campaign(&descriptor, None, true).unwrap();

    assert!(report.has_errors());
    assert!(report.outcome.first_fatal().is_some());
}

#[test]
fn invalid_descriptor_is_an_error() {
    let dir = TempDir::new().unwrap();
    let descriptor = dir.path().join("descriptor.json");
    fs::write(&descriptor, r#"{"campaign": "SURVEY", "survey_data": []}"#).unwrap();

    let error = run_campaign(&descriptor, None, true).unwrap_err();
    assert!(format!("{error:#}").contains("load run descriptor"));
}

#[test]
fn check_summarises_modes() {
    let dir = TempDir::new().unwrap();
    let descriptor = campaign(dir.path(), "");

    let report = check_campaign(&descriptor).unwrap();

    assert_eq!(report.multimode_dataset_name, "MULTIMODE");
    assert_eq!(report.modes.len(), 1);
    let mode = &report.modes[0];
    assert_eq!(mode.mode, "CAWI");
    assert_eq!(mode.data_format, DataFormat::LunaticJson);
    assert_eq!(mode.data_files, 1);
    assert_eq!(mode.variables, 2);
    assert!(report.missing_scripts.is_empty());
}

#[test]
fn check_lists_missing_scripts() {
    let dir = TempDir::new().unwrap();
    let descriptor = campaign(
        dir.path(),
        r#", "transformation_specifications": "missing.vtl""#,
    );

    let report = check_campaign(&descriptor).unwrap();

    assert_eq!(report.missing_scripts, vec![dir.path().join("missing.vtl")]);
}
