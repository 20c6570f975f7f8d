//! Delimited exports of scanned paper questionnaires.
//!
//! The first column holds the identifier. An identifier ending with the
//! instance separator and digits (`RESP_3`) designates the third loop
//! iteration of respondent `RESP`; rows of one respondent are merged.
//! Blank cells are boxes left empty and are not stored.
//!
//! Headers carry no nesting, so a bare name declared in several groups
//! means the shallowest one; `LOOP.FOO` selects the loop variable.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use kraftwerk_model::{Constants, DataFormat, Issue, SurveyRawData};

use super::{DataParser, ParseReport, UnknownVariables};
use crate::error::{IngestError, Result};

#[derive(Debug, Clone, Copy)]
pub struct PaperParser {
    delimiter: u8,
    instance_separator: char,
}

impl PaperParser {
    pub fn new(constants: &Constants) -> Self {
        Self {
            delimiter: constants.paper_delimiter,
            instance_separator: constants.paper_instance_separator,
        }
    }

    /// Split a row identifier into respondent and loop ordinal.
    fn split_identifier<'a>(&self, raw: &'a str) -> (&'a str, usize) {
        if let Some((respondent, suffix)) = raw.rsplit_once(self.instance_separator)
            && !respondent.is_empty()
            && suffix.bytes().all(|b| b.is_ascii_digit())
            && let Ok(number) = suffix.parse::<usize>()
            && number >= 1
        {
            return (respondent, number - 1);
        }
        (raw, 0)
    }
}

impl Default for PaperParser {
    fn default() -> Self {
        Self::new(&Constants::default())
    }
}

impl DataParser for PaperParser {
    fn format(&self) -> DataFormat {
        DataFormat::Paper
    }

    fn parse_reader(
        &self,
        file: &Path,
        reader: &mut dyn BufRead,
        data: &mut SurveyRawData,
        report: &mut ParseReport,
    ) -> Result<()> {
        let csv_error = |source| IngestError::Csv {
            path: file.to_path_buf(),
            source,
        };
        let mut rows = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers: Vec<String> = rows
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() {
            return Err(IngestError::Layout {
                path: file.to_path_buf(),
                reason: "missing header row".to_string(),
            });
        }

        let mut unknown = UnknownVariables::default();
        let known: Vec<bool> = headers
            .iter()
            .skip(1)
            .map(|name| unknown.resolve(data, file, name).is_some())
            .collect();

        let mut positions: HashMap<String, usize> = data
            .questionnaires
            .iter()
            .enumerate()
            .map(|(position, q)| (q.identifier.clone(), position))
            .collect();

        for result in rows.records() {
            let record = match result {
                Ok(record) => record,
                Err(err) if err.is_io_error() => return Err(csv_error(err)),
                Err(err) => {
                    report.skip(Issue::record(file, None, format!("unreadable row: {err}")));
                    continue;
                }
            };
            let raw_id = record.get(0).map(str::trim).unwrap_or_default();
            if record.len() != headers.len() {
                report.skip(Issue::record(
                    file,
                    Some(raw_id).filter(|id| !id.is_empty()),
                    format!(
                        "row has {} fields, header has {}",
                        record.len(),
                        headers.len()
                    ),
                ));
                continue;
            }
            if raw_id.is_empty() {
                report.skip(Issue::record(file, None, "row without identifier"));
                continue;
            }

            let (respondent, ordinal) = self.split_identifier(raw_id);
            let position = match positions.get(respondent) {
                Some(position) => *position,
                None => {
                    let questionnaire = data.new_questionnaire(respondent);
                    data.push(questionnaire);
                    report.records += 1;
                    positions.insert(respondent.to_string(), data.len() - 1);
                    data.len() - 1
                }
            };

            for ((name, value), is_known) in headers.iter().zip(record.iter()).skip(1).zip(&known)
            {
                let value = value.trim();
                if !is_known || value.is_empty() {
                    continue;
                }
                let Some(variable) = data.variables.variable(name) else {
                    continue;
                };
                let path = data.variables.path_for(variable, &[ordinal]);
                data.questionnaires[position].put_value(value, variable.name.as_str(), &path);
            }
        }

        unknown.into_report(report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kraftwerk_model::{Group, PathSegment, Variable, VariableType, VariablesMap};
    use std::io::Cursor;

    fn raw_data() -> SurveyRawData {
        let constants = Constants::default();
        let map = VariablesMap::build(
            &constants,
            vec![Group::child("PERSONS", "RACINE")],
            vec![
                Variable::new("AGE", "RACINE", VariableType::Integer),
                Variable::new("PRENOM", "PERSONS", VariableType::String),
                Variable::new("GENDER_1", "RACINE", VariableType::Boolean).with_ucq("GENDER", "1"),
                Variable::new("GENDER_2", "RACINE", VariableType::Boolean).with_ucq("GENDER", "2"),
            ],
        )
        .unwrap();
        SurveyRawData::new("PAPI", Vec::new(), map)
    }

    fn parse(content: &str) -> (SurveyRawData, ParseReport) {
        let mut data = raw_data();
        let mut report = ParseReport::default();
        PaperParser::default()
            .parse_reader(
                Path::new("papi.txt"),
                &mut Cursor::new(content.as_bytes()),
                &mut data,
                &mut report,
            )
            .unwrap();
        (data, report)
    }

    #[test]
    fn test_split_identifier() {
        let parser = PaperParser::default();
        assert_eq!(parser.split_identifier("RESP_3"), ("RESP", 2));
        assert_eq!(parser.split_identifier("RESP"), ("RESP", 0));
        assert_eq!(parser.split_identifier("A_B"), ("A_B", 0));
        assert_eq!(parser.split_identifier("RESP_0"), ("RESP_0", 0));
    }

    #[test]
    fn test_rows_of_one_respondent_merge() {
        let (data, report) = parse(
            "ID#AGE#PRENOM#GENDER_1#GENDER_2#EXTRA\n\
             R1_1#40#Ann#0#1#x\n\
             R1_2##Bob###\n\
             R2#33#Cid#1#0#\n",
        );
        assert_eq!(data.identifiers().collect::<Vec<_>>(), vec!["R1", "R2"]);
        assert_eq!(report.records, 2);
        assert!(report.unknown_variables.contains("EXTRA"));

        let r1 = &data.questionnaires[0];
        assert_eq!(r1.get_value("AGE", &[]), Some("40"));
        assert_eq!(r1.get_value("GENDER_2", &[]), Some("1"));
        assert_eq!(
            r1.get_value("PRENOM", &[PathSegment::ordinal("PERSONS", 1)]),
            Some("Bob")
        );
        let r2 = &data.questionnaires[1];
        assert_eq!(
            r2.get_value("PRENOM", &[PathSegment::ordinal("PERSONS", 0)]),
            Some("Cid")
        );
    }

    #[test]
    fn test_wrong_field_count_skips_row() {
        let (data, report) = parse("ID#AGE\nR1#40#oops\nR2#30\n");
        assert_eq!(data.identifiers().collect::<Vec<_>>(), vec!["R2"]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.issues[0].identifier.as_deref(), Some("R1"));
    }

    #[test]
    fn test_qualified_header_targets_the_loop_variable() {
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
        let mut data = SurveyRawData::new("PAPI", Vec::new(), map);
        let mut report = ParseReport::default();
        PaperParser::default()
            .parse_reader(
                Path::new("papi.txt"),
                &mut Cursor::new("ID#FOO#LOOP.FOO
R1_2#top#inner
".as_bytes()),
                &mut data,
                &mut report,
            )
            .unwrap();
        assert!(report.unknown_variables.is_empty());
        let r1 = &data.questionnaires[0];
        assert_eq!(r1.get_value("FOO", &[]), Some("top"));
        assert_eq!(
            r1.get_value("FOO", &[PathSegment::ordinal("LOOP", 1)]),
            Some("inner")
        );
    }
}
