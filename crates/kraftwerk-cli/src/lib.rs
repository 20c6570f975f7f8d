//! CLI library components for survey post-processing runs.

pub mod commands;
pub mod logging;
pub mod types;
