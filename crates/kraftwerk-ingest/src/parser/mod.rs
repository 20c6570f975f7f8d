//! Raw-format parsers.
//!
//! Every parser fills a [`SurveyRawData`] from one or more files. Problems
//! limited to one respondent end up as issues in the [`ParseReport`]; only
//! unreadable or malformed files stop parsing.

mod flat_xml;
mod lunatic_json;
mod lunatic_xml;
mod paper;

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Instant;

use kraftwerk_model::{Constants, DataFormat, Issue, SurveyRawData, Variable};
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesRef, BytesStart};
use tracing::{debug, info_span, warn};

use crate::discovery::list_data_files;
use crate::error::{IngestError, Result};
use crate::files::FileAccess;

pub use flat_xml::FlatXmlParser;
pub use lunatic_json::LunaticJsonParser;
pub use lunatic_xml::LunaticXmlParser;
pub use paper::PaperParser;

/// What happened while parsing a mode's files.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    /// Files read, in order.
    pub files: Vec<PathBuf>,
    /// Questionnaires appended to the raw data.
    pub records: usize,
    /// Records dropped, each with an issue.
    pub skipped: usize,
    /// Variables found in the data but absent from the metadata.
    pub unknown_variables: BTreeSet<String>,
    pub issues: Vec<Issue>,
}

impl ParseReport {
    /// Record a dropped respondent.
    pub fn skip(&mut self, issue: Issue) {
        warn!(
            file = ?issue.file,
            identifier = ?issue.identifier,
            "{}",
            issue.message
        );
        self.skipped += 1;
        self.issues.push(issue);
    }

    fn merge(&mut self, other: ParseReport) {
        self.files.extend(other.files);
        self.records += other.records;
        self.skipped += other.skipped;
        self.unknown_variables.extend(other.unknown_variables);
        self.issues.extend(other.issues);
    }
}

/// Tracks unknown variables of one file so that each is logged once.
#[derive(Debug, Default)]
pub(crate) struct UnknownVariables {
    seen: BTreeSet<String>,
}

impl UnknownVariables {
    /// Look up `name`, logging it the first time it is missing.
    pub(crate) fn resolve<'a>(
        &mut self,
        data: &'a SurveyRawData,
        file: &Path,
        name: &str,
    ) -> Option<&'a Variable> {
        let found = data.variables.variable(name);
        if found.is_none() && self.seen.insert(name.to_string()) {
            warn!(
                file = %file.display(),
                variable = name,
                "variable not found in metadata, values ignored"
            );
        }
        found
    }

    pub(crate) fn into_report(self, report: &mut ParseReport) {
        report.unknown_variables.extend(self.seen);
    }
}

/// A parser for one raw encoding.
pub trait DataParser: Send + Sync {
    fn format(&self) -> DataFormat;

    /// Parse one file's content into `data`.
    fn parse_reader(
        &self,
        file: &Path,
        reader: &mut dyn BufRead,
        data: &mut SurveyRawData,
        report: &mut ParseReport,
    ) -> Result<()>;

    /// Parse every file of `data.data_files`, expanding folders.
    fn parse_survey_data(
        &self,
        data: &mut SurveyRawData,
        files: &dyn FileAccess,
    ) -> Result<ParseReport> {
        let mut targets = Vec::new();
        for location in &data.data_files {
            targets.extend(list_data_files(files, location)?);
        }

        let mut report = ParseReport::default();
        for path in targets {
            let _span = info_span!("parse_file", format = %self.format(), file = %path.display())
                .entered();
            let start = Instant::now();
            let mut reader = files
                .open(&path)
                .map_err(|source| IngestError::read(&path, source))?;
            let before = data.len();
            let mut file_report = ParseReport::default();
            self.parse_reader(&path, reader.as_mut(), data, &mut file_report)?;
            file_report.files.push(path.clone());
            debug!(
                records = file_report.records,
                skipped = file_report.skipped,
                questionnaires = data.len() - before,
                duration_ms = start.elapsed().as_millis(),
                "file parsed"
            );
            report.merge(file_report);
        }
        Ok(report)
    }
}

/// Parser for a data format.
pub fn parser_for(format: DataFormat, constants: &Constants) -> Box<dyn DataParser> {
    match format {
        DataFormat::FlatXml => Box::new(FlatXmlParser),
        DataFormat::LunaticXml => Box::new(LunaticXmlParser),
        DataFormat::LunaticJson => Box::new(LunaticJsonParser),
        DataFormat::Paper => Box::new(PaperParser::new(constants)),
    }
}

/// Answers of one respondent collected while reading a file, committed to
/// the raw data once the whole record has been seen.
#[derive(Debug, Default)]
pub(crate) struct PendingRecord {
    identifier: Option<String>,
    /// (variable, loop ordinals, value); `None` is a null array entry.
    values: Vec<(String, Vec<usize>, Option<String>)>,
    failure: Option<String>,
}

impl PendingRecord {
    pub(crate) fn set_identifier(&mut self, identifier: &str) {
        let identifier = identifier.trim();
        if !identifier.is_empty() {
            self.identifier = Some(identifier.to_string());
        }
    }

    pub(crate) fn push(&mut self, variable: &str, ordinals: &[usize], value: String) {
        self.values
            .push((variable.to_string(), ordinals.to_vec(), Some(value)));
    }

    /// Null entry of an array: the instance exists but holds no value.
    pub(crate) fn push_null(&mut self, variable: &str, ordinals: &[usize]) {
        self.values
            .push((variable.to_string(), ordinals.to_vec(), None));
    }

    /// Mark the record as malformed. The first reason wins.
    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        if self.failure.is_none() {
            self.failure = Some(reason.into());
        }
    }

    /// Append the record to `data`, or skip it with an issue when it has no
    /// identifier or is malformed.
    pub(crate) fn commit(self, file: &Path, data: &mut SurveyRawData, report: &mut ParseReport) {
        let Some(identifier) = self.identifier else {
            report.skip(Issue::record(file, None, "record without identifier"));
            return;
        };
        if let Some(reason) = self.failure {
            report.skip(Issue::record(file, Some(identifier.as_str()), reason));
            return;
        }

        let mut questionnaire = data.new_questionnaire(identifier.as_str());
        for (name, ordinals, value) in self.values {
            let Some(variable) = data.variables.resolve_variable(&name, ordinals.len()) else {
                continue;
            };
            let depth = data.variables.depth(&variable.group);
            if ordinals.len() > depth {
                report.skip(Issue::record(
                    file,
                    Some(identifier.as_str()),
                    format!(
                        "value of {name} is nested {} levels deep but group {} is at depth {depth}",
                        ordinals.len(),
                        variable.group
                    ),
                ));
                return;
            }
            let path = data.variables.path_for(variable, &ordinals);
            match value {
                Some(value) => questionnaire.put_value(value, name, &path),
                None => {
                    questionnaire.answers.ensure_path(&path);
                }
            }
        }
        data.push(questionnaire);
        report.records += 1;
    }
}

/// Render an XML name as text.
pub(crate) fn xml_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Unescaped value of an attribute, by local name.
pub(crate) fn xml_attribute(
    start: &BytesStart<'_>,
    key: &[u8],
) -> std::result::Result<Option<String>, quick_xml::Error> {
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == key {
            let raw = String::from_utf8_lossy(&attr.value);
            let value = unescape(&raw).map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Append the text of a character or entity reference.
pub(crate) fn push_xml_reference(
    buffer: &mut String,
    reference: &BytesRef<'_>,
) -> std::result::Result<(), quick_xml::Error> {
    if let Some(ch) = reference.resolve_char_ref()? {
        buffer.push(ch);
        return Ok(());
    }
    let name = reference.decode().map_err(quick_xml::Error::from)?;
    match resolve_predefined_entity(&name) {
        Some(text) => buffer.push_str(text),
        None => {
            buffer.push('&');
            buffer.push_str(&name);
            buffer.push(';');
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_for_every_format() {
        let constants = Constants::default();
        for format in DataFormat::ALL {
            assert_eq!(parser_for(format, &constants).format(), format);
        }
    }
}
