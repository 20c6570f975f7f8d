use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Invalid descriptor or metadata.
    Configuration,
    /// Malformed or schema-mismatched respondent data.
    Record,
    /// A file could not be read or written.
    Io,
    /// A transformation script failed.
    Vtl,
    /// A dataset required by a step was not produced.
    MissingDataset,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Configuration => "configuration",
            IssueKind::Record => "record",
            IssueKind::Io => "io",
            IssueKind::Vtl => "vtl",
            IssueKind::MissingDataset => "missing_dataset",
        }
    }
}

/// A problem recorded during a run, with enough context to locate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    /// Collection mode the issue belongs to.
    pub mode: Option<String>,
    /// Source file being read.
    pub file: Option<PathBuf>,
    /// Respondent identifier.
    pub identifier: Option<String>,
    /// Offending script instruction.
    pub fragment: Option<String>,
}

impl Issue {
    pub fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            mode: None,
            file: None,
            identifier: None,
            fragment: None,
        }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, message)
    }

    pub fn fatal(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Fatal, message)
    }

    /// A skipped respondent record.
    pub fn record(file: &Path, identifier: Option<&str>, message: impl Into<String>) -> Self {
        let mut issue = Self::warning(IssueKind::Record, message).with_file(file);
        issue.identifier = identifier.map(str::to_string);
        issue
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind.as_str())?;
        if let Some(mode) = &self.mode {
            write!(f, " mode={mode}")?;
        }
        if let Some(file) = &self.file {
            write!(f, " file={}", file.display())?;
        }
        if let Some(identifier) = &self.identifier {
            write!(f, " id={identifier}")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(fragment) = &self.fragment {
            write!(f, " (in `{fragment}`)")?;
        }
        Ok(())
    }
}
