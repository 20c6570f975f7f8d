//! Contract with the external VTL engine.
//!
//! The pipeline only decides which script runs at which point and over which
//! bindings. Script semantics belong to the engine behind [`VtlEngine`].

use std::fmt;
use std::path::Path;

use kraftwerk_ingest::FileAccess;
use kraftwerk_model::{Issue, IssueKind};
use tracing::debug;

use crate::bindings::BindingStore;

/// A script instruction the engine could not execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VtlError {
    pub instruction: String,
    pub message: String,
}

impl fmt::Display for VtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (in `{}`)", self.message, self.instruction)
    }
}

/// Executes VTL scripts over the datasets of a run.
///
/// Instructions that fail are reported and skipped; the engine carries on
/// with the next one.
pub trait VtlEngine: Send + Sync {
    fn evaluate(&self, script: &str, store: &mut BindingStore) -> Vec<VtlError>;
}

/// Engine used when no VTL implementation is plugged in: every instruction
/// of a non-blank script is reported as not executed.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableVtlEngine;

impl VtlEngine for UnavailableVtlEngine {
    fn evaluate(&self, script: &str, _store: &mut BindingStore) -> Vec<VtlError> {
        instructions(script)
            .map(|instruction| VtlError {
                instruction: instruction.to_string(),
                message: "no VTL engine available, instruction not executed".to_string(),
            })
            .collect()
    }
}

/// Non-blank instructions of a script, comment lines removed.
pub fn instructions(script: &str) -> impl Iterator<Item = &str> {
    script
        .split(';')
        .filter(|chunk| {
            chunk.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("//")
            })
        })
        .map(str::trim)
}

/// Read and run an optional script, returning the issues it produced.
///
/// An unreadable script is a warning: the step goes on without it.
pub fn run_script(
    engine: &dyn VtlEngine,
    files: &dyn FileAccess,
    script: Option<&Path>,
    store: &mut BindingStore,
) -> Vec<Issue> {
    let Some(path) = script else {
        return Vec::new();
    };
    let content = match files.read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            return vec![
                Issue::warning(IssueKind::Vtl, format!("script cannot be read: {err}"))
                    .with_file(path),
            ];
        }
    };
    if content.trim().is_empty() {
        return Vec::new();
    }
    debug!(script = %path.display(), "evaluating VTL script");
    engine
        .evaluate(&content, store)
        .into_iter()
        .map(|error| {
            Issue::warning(IssueKind::Vtl, error.message)
                .with_file(path)
                .with_fragment(error.instruction)
        })
        .collect()
}
