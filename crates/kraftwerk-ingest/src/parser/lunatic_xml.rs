//! Lunatic XML exports, read as a stream.
//!
//! ```xml
//! <SurveyUnits>
//!   <SurveyUnit>
//!     <Id>0001</Id>
//!     <Data>
//!       <COLLECTED>
//!         <AGE><COLLECTED type="integer">40</COLLECTED><EDITED/></AGE>
//!         <PRENOM><COLLECTED type="array"><COLLECTED>Ann</COLLECTED><COLLECTED type="null"/></COLLECTED></PRENOM>
//!       </COLLECTED>
//!       <EXTERNAL><ADDRESS>Rue X</ADDRESS></EXTERNAL>
//!       <CALCULATED>...</CALCULATED>
//!     </Data>
//!   </SurveyUnit>
//! </SurveyUnits>
//! ```
//!
//! Only one survey unit is buffered at a time. Children of an array node are
//! the successive instances of the next group in the variable's chain; a
//! `type="null"` child still opens its instance, without a value.

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
pub struct LunaticXmlParser;

#[derive(Debug)]
enum Frame {
    Outer,
    Unit,
    Id,
    Data,
    Collected,
    External,
    /// Variable element of the COLLECTED section, holding state children.
    Variable,
    /// Value node with `type="array"`; `next` is the ordinal of the next child.
    Array { next: usize, indexed: bool },
    Leaf { indexed: bool },
    Null { indexed: bool },
    Skip,
}

struct LunaticXmlReader<'a> {
    file: &'a Path,
    data: &'a mut SurveyRawData,
    report: &'a mut ParseReport,
    unknown: UnknownVariables,
    stack: Vec<Frame>,
    unit: Option<PendingRecord>,
    variable: String,
    ordinals: Vec<usize>,
    text: String,
}

impl LunaticXmlReader<'_> {
    fn start(&mut self, element: &BytesStart<'_>) -> std::result::Result<(), quick_xml::Error> {
        let name = xml_name(element.local_name().as_ref());
        let frame = match self.stack.last_mut() {
            None | Some(Frame::Outer) if name == "SurveyUnit" => {
                self.unit = Some(PendingRecord::default());
                Frame::Unit
            }
            None | Some(Frame::Outer) => Frame::Outer,
            Some(Frame::Unit) => match name.as_str() {
                "Id" => {
                    self.text.clear();
                    Frame::Id
                }
                "Data" => Frame::Data,
                _ => Frame::Skip,
            },
            Some(Frame::Data) => match name.as_str() {
                "COLLECTED" => Frame::Collected,
                "EXTERNAL" => Frame::External,
                _ => Frame::Skip,
            },
            Some(Frame::Collected) => {
                if self.unknown.resolve(self.data, self.file, &name).is_some() {
                    self.variable = name;
                    self.ordinals.clear();
                    Frame::Variable
                } else {
                    Frame::Skip
                }
            }
            Some(Frame::External) => {
                if self.unknown.resolve(self.data, self.file, &name).is_some() {
                    self.variable = name;
                    self.ordinals.clear();
                    Self::value_node(&mut self.text, element, false)?
                } else {
                    Frame::Skip
                }
            }
            Some(Frame::Variable) if name == "COLLECTED" => {
                Self::value_node(&mut self.text, element, false)?
            }
            Some(Frame::Array { next, .. }) => {
                let ordinal = *next;
                *next += 1;
                self.ordinals.push(ordinal);
                Self::value_node(&mut self.text, element, true)?
            }
            Some(Frame::Leaf { .. }) => {
                if let Some(unit) = self.unit.as_mut() {
                    unit.fail(format!(
                        "value of {} contains element <{name}>",
                        self.variable
                    ));
                }
                Frame::Skip
            }
            Some(_) => Frame::Skip,
        };
        self.stack.push(frame);
        Ok(())
    }

    /// Frame for a value node, from its `type` attribute.
    fn value_node(
        text: &mut String,
        element: &BytesStart<'_>,
        indexed: bool,
    ) -> std::result::Result<Frame, quick_xml::Error> {
        Ok(match xml_attribute(element, b"type")?.as_deref() {
            Some("array") => Frame::Array { next: 0, indexed },
            Some("null") => Frame::Null { indexed },
            _ => {
                text.clear();
                Frame::Leaf { indexed }
            }
        })
    }

    fn end(&mut self) {
        match self.stack.pop() {
            Some(Frame::Id) => {
                let text = std::mem::take(&mut self.text);
                if let Some(unit) = self.unit.as_mut() {
                    unit.set_identifier(&text);
                }
            }
            Some(Frame::Leaf { indexed }) => {
                let value = std::mem::take(&mut self.text);
                if let Some(unit) = self.unit.as_mut() {
                    unit.push(&self.variable, &self.ordinals, value);
                }
                if indexed {
                    self.ordinals.pop();
                }
            }
            Some(Frame::Null { indexed: true }) => {
                if let Some(unit) = self.unit.as_mut() {
                    unit.push_null(&self.variable, &self.ordinals);
                }
                self.ordinals.pop();
            }
            Some(Frame::Array { indexed: true, .. }) => {
                self.ordinals.pop();
            }
            Some(Frame::Unit) => {
                if let Some(unit) = self.unit.take() {
                    unit.commit(self.file, self.data, self.report);
                }
            }
            _ => {}
        }
    }

    fn collecting(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Leaf { .. } | Frame::Id))
    }
}

impl DataParser for LunaticXmlParser {
    fn format(&self) -> DataFormat {
        DataFormat::LunaticXml
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

        let mut state = LunaticXmlReader {
            file,
            data,
            report,
            unknown: UnknownVariables::default(),
            stack: Vec::new(),
            unit: None,
            variable: String::new(),
            ordinals: Vec::new(),
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
