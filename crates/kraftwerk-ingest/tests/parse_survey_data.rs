//! End-to-end parsing through the file access layer.

use std::fs;
use std::path::Path;

use kraftwerk_ingest::{
    DataParser, IngestError, LocalFileAccess, load_variables_map, parser_for,
};
use kraftwerk_model::{Constants, DataFormat, PathSegment, SurveyRawData};
use tempfile::TempDir;

const METADATA: &str = r#"{
    "groups": [{"name": "PERSONS", "parent": "RACINE"}],
    "variables": [
        {"name": "AGE", "group": "RACINE", "type": "INTEGER"},
        {"name": "PRENOM", "group": "PERSONS", "type": "STRING"}
    ]
}"#;

fn raw_data(dir: &Path, data_location: &Path) -> SurveyRawData {
    let meta = dir.join("meta.json");
    fs::write(&meta, METADATA).unwrap();
    let variables = load_variables_map(&LocalFileAccess, &meta, &Constants::default()).unwrap();
    SurveyRawData::new("CAWI", vec![data_location.to_path_buf()], variables)
}

#[test]
fn folder_of_json_files_is_parsed_in_name_order() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    fs::create_dir(&data_dir).unwrap();
    fs::write(
        data_dir.join("b.json"),
        r#"{"id": "U2", "data": {"COLLECTED": {"AGE": {"COLLECTED": 31}}}}"#,
    )
    .unwrap();
    fs::write(
        data_dir.join("a.json"),
        r#"[{"id": "U1", "data": {"COLLECTED": {
            "AGE": {"COLLECTED": 30},
            "PRENOM": {"COLLECTED": ["Ann", "Bob"]},
            "NOT_IN_METADATA": {"COLLECTED": "x"}
        }}}]"#,
    )
    .unwrap();

    let mut data = raw_data(dir.path(), &data_dir);
    let report = parser_for(DataFormat::LunaticJson, &Constants::default())
        .parse_survey_data(&mut data, &LocalFileAccess)
        .unwrap();

    assert_eq!(report.files.len(), 2);
    assert_eq!(report.records, 2);
    assert!(report.unknown_variables.contains("NOT_IN_METADATA"));
    assert_eq!(data.identifiers().collect::<Vec<_>>(), vec!["U1", "U2"]);
    assert_eq!(
        data.questionnaires[0].get_value("PRENOM", &[PathSegment::ordinal("PERSONS", 1)]),
        Some("Bob")
    );
}

#[test]
fn lunatic_xml_file_is_streamed() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("cawi.xml");
    fs::write(
        &file,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SurveyUnits>
  <SurveyUnit>
    <Id>U1</Id>
    <Data>
      <COLLECTED>
        <AGE><COLLECTED type="integer">40</COLLECTED></AGE>
        <PRENOM><COLLECTED type="array"><COLLECTED>Ann</COLLECTED></COLLECTED></PRENOM>
      </COLLECTED>
    </Data>
  </SurveyUnit>
</SurveyUnits>"#,
    )
    .unwrap();

    let mut data = raw_data(dir.path(), &file);
    let report = parser_for(DataFormat::LunaticXml, &Constants::default())
        .parse_survey_data(&mut data, &LocalFileAccess)
        .unwrap();
    assert_eq!(report.records, 1);
    assert_eq!(data.questionnaires[0].get_value("AGE", &[]), Some("40"));
}

#[test]
fn missing_data_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut data = raw_data(dir.path(), &dir.path().join("absent.xml"));
    let result = parser_for(DataFormat::FlatXml, &Constants::default())
        .parse_survey_data(&mut data, &LocalFileAccess);
    assert!(matches!(result, Err(IngestError::FileNotFound { .. })));
}
