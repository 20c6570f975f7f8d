use thiserror::Error;

/// Errors raised while building questionnaire metadata.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("group '{group}' is its own ancestor (cycle: {})", chain.join(" -> "))]
    CyclicGroup { group: String, chain: Vec<String> },
    #[error("group '{group}' has unknown parent '{parent}'")]
    UnknownParent { group: String, parent: String },
    #[error("group '{0}' has no parent but is not the root group")]
    SecondRoot(String),
    #[error("root group '{0}' cannot have a parent")]
    RootWithParent(String),
    #[error("variable '{variable}' belongs to unknown group '{group}'")]
    UnknownGroup { variable: String, group: String },
    #[error("variable '{variable}' is declared twice in group '{group}'")]
    DuplicateVariable { variable: String, group: String },
    #[error("name '{name}' is already used as {used_as}")]
    NameCollision { name: String, used_as: String },
    #[error("invalid variable type: {0}")]
    InvalidVariableType(String),
}

/// Errors raised while validating a run descriptor.
///
/// All of these are detected before any data file is opened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing mandatory field '{0}'")]
    MissingField(String),
    #[error("mode {index}: missing mandatory field '{field}'")]
    MissingModeField { index: usize, field: String },
    #[error("no survey data declared")]
    NoModes,
    #[error("mode '{0}' is declared more than once")]
    DuplicateMode(String),
    #[error("unrecognized data format '{value}' (expected one of {expected})")]
    UnknownDataFormat { value: String, expected: String },
    #[error("mode '{mode}' clashes with {used_as}")]
    ReservedModeLabel { mode: String, used_as: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
