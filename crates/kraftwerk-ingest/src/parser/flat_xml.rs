//! Flat XML exports: one element per variable, no loops.
//!
//! ```xml
//! <Questionnaires>
//!   <Questionnaire id="0001">
//!     <AGE>40</AGE>
//!     <NAME/>
//!   </Questionnaire>
//! </Questionnaires>
//! ```

use std::io::BufRead;
use std::path::Path;

use kraftwerk_model::{DataFormat, SurveyRawData};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{
    DataParser, ParseReport, PendingRecord, UnknownVariables, push_xml_reference, xml_attribute,
    xml_name,
};
use crate::error::{IngestError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct FlatXmlParser;

#[derive(Debug)]
enum Frame {
    Outer,
    Questionnaire,
    Value(String),
    Skip,
}

struct FlatXmlReader<'a> {
    file: &'a Path,
    data: &'a mut SurveyRawData,
    report: &'a mut ParseReport,
    unknown: UnknownVariables,
    stack: Vec<Frame>,
    record: Option<PendingRecord>,
    text: String,
}

impl FlatXmlReader<'_> {
    fn start(&mut self, element: &BytesStart<'_>) -> std::result::Result<(), quick_xml::Error> {
        let name = xml_name(element.local_name().as_ref());
        let frame = match self.stack.last() {
            None | Some(Frame::Outer) if name == "Questionnaire" => {
                let mut record = PendingRecord::default();
                if let Some(id) = xml_attribute(element, b"id")? {
                    record.set_identifier(&id);
                }
                self.record = Some(record);
                Frame::Questionnaire
            }
            None | Some(Frame::Outer) => Frame::Outer,
            Some(Frame::Questionnaire) => {
                self.text.clear();
                if self.unknown.resolve(self.data, self.file, &name).is_some() {
                    Frame::Value(name)
                } else {
                    Frame::Skip
                }
            }
            Some(Frame::Value(variable)) => {
                if let Some(record) = self.record.as_mut() {
                    record.fail(format!("variable {variable} contains element <{name}>"));
                }
                Frame::Skip
            }
            Some(Frame::Skip) => Frame::Skip,
        };
        self.stack.push(frame);
        Ok(())
    }

    fn end(&mut self) {
        match self.stack.pop() {
            Some(Frame::Value(variable)) => {
                let value = std::mem::take(&mut self.text);
                if let Some(record) = self.record.as_mut() {
                    record.push(&variable, &[], value);
                }
            }
            Some(Frame::Questionnaire) => {
                if let Some(record) = self.record.take() {
                    record.commit(self.file, self.data, self.report);
                }
            }
            _ => {}
        }
    }

    fn collecting(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Value(_)))
    }
}

impl DataParser for FlatXmlParser {
    fn format(&self) -> DataFormat {
        DataFormat::FlatXml
    }

    fn parse_reader(
        &self,
        file: &Path,
        reader: &mut dyn BufRead,
        data: &mut SurveyRawData,
        report: &mut ParseReport,
    ) -> Result<()> {
        let mut xml = Reader::from_reader(reader);
        xml.config_mut().trim_text(false);

        let mut state = FlatXmlReader {
            file,
            data,
            report,
            unknown: UnknownVariables::default(),
            stack: Vec::new(),
            record: None,
            text: String::new(),
        };
        let mut buf = Vec::new();

        loop {
            let event = xml.read_event_into(&mut buf);
            let step = match event {
                Ok(Event::Start(e)) => state.start(&e),
                Ok(Event::Empty(e)) => state.start(&e).map(|()| state.end()),
                Ok(Event::End(_)) => {
                    state.end();
                    Ok(())
                }
                Ok(Event::Text(t)) if state.collecting() => t
                    .decode()
                    .map(|text| state.text.push_str(&text))
                    .map_err(quick_xml::Error::from),
                Ok(Event::CData(t)) if state.collecting() => t
                    .decode()
                    .map(|text| state.text.push_str(&text))
                    .map_err(quick_xml::Error::from),
                Ok(Event::GeneralRef(r)) if state.collecting() => {
                    push_xml_reference(&mut state.text, &r)
                }
                Ok(Event::Eof) => break,
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            };
            step.map_err(|source| IngestError::Xml {
                path: file.to_path_buf(),
                position: xml.buffer_position(),
                source,
            })?;
            buf.clear();
        }

        state.unknown.into_report(state.report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kraftwerk_model::{Constants, Group, Variable, VariableType, VariablesMap};
    use std::io::Cursor;

    fn raw_data() -> SurveyRawData {
        let constants = Constants::default();
        let map = VariablesMap::build(
            &constants,
            vec![Group::child("PERSONS", "RACINE")],
            vec![
                Variable::new("AGE", "RACINE", VariableType::Integer),
                Variable::new("NAME", "RACINE", VariableType::String),
                Variable::new("PRENOM", "PERSONS", VariableType::String),
            ],
        )
        .unwrap();
        SurveyRawData::new("CAPI", Vec::new(), map)
    }

    fn parse(xml: &str) -> (SurveyRawData, ParseReport) {
        let mut data = raw_data();
        let mut report = ParseReport::default();
        FlatXmlParser
            .parse_reader(
                Path::new("capi.xml"),
                &mut Cursor::new(xml.as_bytes()),
                &mut data,
                &mut report,
            )
            .unwrap();
        (data, report)
    }

    #[test]
    fn test_values_and_empty_elements() {
        let (data, report) = parse(
            r#"<Questionnaires>
                 <Questionnaire id="Q1"><AGE>40</AGE><NAME/><PRENOM>Ann &amp; Bo</PRENOM></Questionnaire>
               </Questionnaires>"#,
        );
        assert_eq!(report.records, 1);
        let q = &data.questionnaires[0];
        assert_eq!(q.identifier, "Q1");
        assert_eq!(q.get_value("AGE", &[]), Some("40"));
        assert_eq!(q.get_value("NAME", &[]), Some(""));
        let path = data
            .variables
            .path_for(data.variables.variable("PRENOM").unwrap(), &[]);
        assert_eq!(q.get_value("PRENOM", &path), Some("Ann & Bo"));
    }

    #[test]
    fn test_questionnaire_without_id_is_skipped() {
        let (data, report) = parse(
            r#"<Questionnaires>
                 <Questionnaire><AGE>1</AGE></Questionnaire>
                 <Questionnaire id="Q2"><AGE>2</AGE><UNKNOWN>x</UNKNOWN></Questionnaire>
               </Questionnaires>"#,
        );
        assert_eq!(data.len(), 1);
        assert_eq!(report.skipped, 1);
        assert!(report.unknown_variables.contains("UNKNOWN"));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let mut data = raw_data();
        let mut report = ParseReport::default();
        let result = FlatXmlParser.parse_reader(
            Path::new("capi.xml"),
            &mut Cursor::new(b"<Questionnaires><Questionnaire id=\"Q\"></Oops>".as_slice()),
            &mut data,
            &mut report,
        );
        assert!(matches!(result, Err(IngestError::Xml { .. })));
    }
}
