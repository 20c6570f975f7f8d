//! Data model shared by every stage of survey post-processing.
//!
//! - [`metadata`]: variables, groups and the per-mode [`VariablesMap`]
//! - [`raw_data`]: respondent answer trees ([`SurveyRawData`])
//! - [`config`]: the run descriptor and its validation
//! - [`constants`]: reserved names and length bounds of a run
//! - [`issue`] / [`outcome`]: what a run reports back

pub mod config;
pub mod constants;
pub mod error;
pub mod issue;
pub mod metadata;
pub mod outcome;
pub mod raw_data;

pub use config::{DataFormat, ModeConfig, ModeInputs, RunConfig, UserInputs};
pub use constants::Constants;
pub use error::{ConfigError, ModelError, Result};
pub use issue::{Issue, IssueKind, Severity};
pub use metadata::{Group, UcqModality, Variable, VariableType, VariablesMap};
pub use outcome::{RunOutcome, RunStatus};
pub use raw_data::{
    GroupData, GroupInstance, PathSegment, PathStep, QuestionnaireData, SurveyRawData,
    instance_id,
};
