//! Lunatic JSON exports.
//!
//! A file holds one survey unit, an array of units, or an object with a
//! `surveyUnits` array. A unit looks like:
//!
//! ```json
//! {"id": "0001", "data": {
//!     "COLLECTED": {"AGE": {"COLLECTED": 40, "EDITED": 41}, "PRENOM": {"COLLECTED": ["Ann", null]}},
//!     "EXTERNAL": {"ADDRESS": "Rue X"}
//! }}
//! ```
//!
//! Array positions are loop ordinals. A `null` inside an array still opens
//! its instance, so loop ids never skip a position; a top-level `null` is
//! simply absent.

use std::io::BufRead;
use std::path::Path;

use kraftwerk_model::{DataFormat, SurveyRawData};
use serde_json::{Map, Value};

use super::{DataParser, ParseReport, PendingRecord, UnknownVariables};
use crate::error::{IngestError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct LunaticJsonParser;

/// Flatten a JSON value into (ordinals, text) leaves. `null` has no text and
/// is only kept inside arrays.
fn collect_values(
    value: &Value,
    ordinals: &mut Vec<usize>,
    out: &mut Vec<(Vec<usize>, Option<String>)>,
) -> std::result::Result<(), String> {
    match value {
        Value::Null if ordinals.is_empty() => {}
        Value::Null => out.push((ordinals.clone(), None)),
        Value::String(text) => out.push((ordinals.clone(), Some(text.clone()))),
        Value::Number(number) => out.push((ordinals.clone(), Some(number.to_string()))),
        Value::Bool(flag) => out.push((ordinals.clone(), Some(flag.to_string()))),
        Value::Array(items) => {
            for (ordinal, item) in items.iter().enumerate() {
                ordinals.push(ordinal);
                let result = collect_values(item, ordinals, out);
                ordinals.pop();
                result?;
            }
        }
        Value::Object(_) => return Err("unexpected object where a value was expected".to_string()),
    }
    Ok(())
}

fn read_section(
    section: &Map<String, Value>,
    collected_state: bool,
    file: &Path,
    data: &SurveyRawData,
    unknown: &mut UnknownVariables,
    record: &mut PendingRecord,
) {
    for (name, raw) in section {
        if unknown.resolve(data, file, name).is_none() {
            continue;
        }
        let value = match raw {
            Value::Object(states) if collected_state => match states.get("COLLECTED") {
                Some(value) => value,
                None => continue,
            },
            other => other,
        };
        let mut leaves = Vec::new();
        if let Err(reason) = collect_values(value, &mut Vec::new(), &mut leaves) {
            record.fail(format!("{name}: {reason}"));
            continue;
        }
        for (ordinals, text) in leaves {
            match text {
                Some(text) => record.push(name, &ordinals, text),
                None => record.push_null(name, &ordinals),
            }
        }
    }
}

fn read_unit(
    unit: &Value,
    file: &Path,
    data: &SurveyRawData,
    unknown: &mut UnknownVariables,
) -> PendingRecord {
    let mut record = PendingRecord::default();
    let Some(unit) = unit.as_object() else {
        record.fail("survey unit is not an object");
        return record;
    };
    match unit.get("id") {
        Some(Value::String(id)) => record.set_identifier(id),
        Some(Value::Number(id)) => record.set_identifier(&id.to_string()),
        _ => {}
    }
    let Some(sections) = unit.get("data").and_then(Value::as_object) else {
        return record;
    };
    if let Some(collected) = sections.get("COLLECTED").and_then(Value::as_object) {
        read_section(collected, true, file, data, unknown, &mut record);
    }
    if let Some(external) = sections.get("EXTERNAL").and_then(Value::as_object) {
        read_section(external, false, file, data, unknown, &mut record);
    }
    record
}

impl DataParser for LunaticJsonParser {
    fn format(&self) -> DataFormat {
        DataFormat::LunaticJson
    }

    fn parse_reader(
        &self,
        file: &Path,
        reader: &mut dyn BufRead,
        data: &mut SurveyRawData,
        report: &mut ParseReport,
    ) -> Result<()> {
        let document: Value =
            serde_json::from_reader(reader).map_err(|source| IngestError::Json {
                path: file.to_path_buf(),
                source,
            })?;

        let units: Vec<&Value> = match &document {
            Value::Array(units) => units.iter().collect(),
            Value::Object(object) => match object.get("surveyUnits") {
                Some(Value::Array(units)) => units.iter().collect(),
                Some(_) => {
                    return Err(IngestError::Layout {
                        path: file.to_path_buf(),
                        reason: "surveyUnits is not an array".to_string(),
                    });
                }
                None => vec![&document],
            },
            _ => {
                return Err(IngestError::Layout {
                    path: file.to_path_buf(),
                    reason: "expected a survey unit object or an array of them".to_string(),
                });
            }
        };

        let mut unknown = UnknownVariables::default();
        for unit in units {
            let record = read_unit(unit, file, data, &mut unknown);
            record.commit(file, data, report);
        }
        unknown.into_report(report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kraftwerk_model::{Constants, Group, PathSegment, Variable, VariableType, VariablesMap};
    use std::io::Cursor;

    fn raw_data() -> SurveyRawData {
        let constants = Constants::default();
        let map = VariablesMap::build(
            &constants,
            vec![Group::child("PERSONS", "RACINE")],
            vec![
                Variable::new("AGE", "RACINE", VariableType::Integer),
                Variable::new("ADDRESS", "RACINE", VariableType::String),
                Variable::new("PRENOM", "PERSONS", VariableType::String),
                Variable::new("ADULT", "PERSONS", VariableType::Boolean),
            ],
        )
        .unwrap();
        SurveyRawData::new("CAWI", Vec::new(), map)
    }

    fn parse(json: &str) -> Result<(SurveyRawData, ParseReport)> {
        let mut data = raw_data();
        let mut report = ParseReport::default();
        LunaticJsonParser.parse_reader(
            Path::new("cawi.json"),
            &mut Cursor::new(json.as_bytes()),
            &mut data,
            &mut report,
        )?;
        Ok((data, report))
    }

    #[test]
    fn test_single_unit_with_loops() {
        let (data, report) = parse(
            r#"{"id": "U1", "data": {
                "COLLECTED": {
                    "AGE": {"COLLECTED": 40, "EDITED": 41},
                    "PRENOM": {"COLLECTED": ["Ann", null, "Cid"]},
                    "ADULT": {"COLLECTED": [true, false]}
                },
                "EXTERNAL": {"ADDRESS": "Rue X"}
            }}"#,
        )
        .unwrap();
        assert_eq!(report.records, 1);
        let q = &data.questionnaires[0];
        assert_eq!(q.get_value("AGE", &[]), Some("40"));
        assert_eq!(q.get_value("ADDRESS", &[]), Some("Rue X"));
        let person = |n| vec![PathSegment::ordinal("PERSONS", n)];
        assert_eq!(q.get_value("PRENOM", &person(0)), Some("Ann"));
        assert_eq!(q.get_value("PRENOM", &person(1)), None);
        assert_eq!(q.get_value("PRENOM", &person(2)), Some("Cid"));
        assert_eq!(q.get_value("ADULT", &person(1)), Some("false"));
    }

    #[test]
    fn test_unknown_variable_is_not_fatal() {
        let (data, report) = parse(
            r#"{"surveyUnits": [
                {"id": "U1", "data": {"COLLECTED": {"MYSTERY": {"COLLECTED": "x"}, "AGE": {"COLLECTED": "30"}}}},
                {"id": "U2", "data": {"COLLECTED": {"AGE": {"COLLECTED": "31"}}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(data.len(), 2);
        assert!(report.unknown_variables.contains("MYSTERY"));
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_unit_without_id_is_skipped() {
        let (data, report) =
            parse(r#"[{"data": {}}, {"id": "U2", "data": {}}]"#).unwrap();
        assert_eq!(data.identifiers().collect::<Vec<_>>(), vec!["U2"]);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(parse("{not json"), Err(IngestError::Json { .. })));
        assert!(matches!(parse("42"), Err(IngestError::Layout { .. })));
    }

    #[test]
    fn test_null_array_entry_keeps_its_instance() {
        let (data, _) = parse(
            r#"{"id": "U1", "data": {"COLLECTED": {
                "PRENOM": {"COLLECTED": [null, "Bob"]},
                "AGE": {"COLLECTED": null}
            }}}"#,
        )
        .unwrap();
        let q = &data.questionnaires[0];
        assert_eq!(q.get_value("AGE", &[]), None);
        let persons = q.answers.subgroup("PERSONS").unwrap();
        let ids: Vec<&str> = persons.instances().map(|instance| instance.id()).collect();
        assert_eq!(ids, vec!["PERSONS-01", "PERSONS-02"]);
        assert_eq!(persons.instances().next().unwrap().values().count(), 0);
        assert_eq!(
            q.get_value("PRENOM", &[PathSegment::ordinal("PERSONS", 1)]),
            Some("Bob")
        );
    }

    #[test]
    fn test_same_name_resolves_by_nesting() {
        let constants = Constants::default();
        let map = VariablesMap::build(
            &constants,
            vec![Group::child("LOOP", "RACINE")],
            vec![
                Variable::new("FOO", "RACINE", VariableType::String),
                Variable::new("FOO", "LOOP", VariableType::String),
            ],
        )
        .unwrap();
        let mut data = SurveyRawData::new("CAWI", Vec::new(), map);
        let mut report = ParseReport::default();
        LunaticJsonParser
            .parse_reader(
                Path::new("cawi.json"),
                &mut Cursor::new(
                    r#"[
                        {"id": "U1", "data": {"COLLECTED": {"FOO": {"COLLECTED": "top"}}}},
                        {"id": "U2", "data": {"COLLECTED": {"FOO": {"COLLECTED": ["a", "b"]}}}}
                    ]"#
                    .as_bytes(),
                ),
                &mut data,
                &mut report,
            )
            .unwrap();
        assert_eq!(report.records, 2);
        let loop_at = |n| vec![PathSegment::ordinal("LOOP", n)];
        let u1 = &data.questionnaires[0];
        assert_eq!(u1.get_value("FOO", &[]), Some("top"));
        assert!(u1.answers.subgroup("LOOP").is_none());
        let u2 = &data.questionnaires[1];
        assert_eq!(u2.get_value("FOO", &[]), None);
        assert_eq!(u2.get_value("FOO", &loop_at(1)), Some("b"));
    }
}
