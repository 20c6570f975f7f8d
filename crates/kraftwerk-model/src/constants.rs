//! Reserved names, separators and length bounds shared by every stage of a run.
//!
//! A [`Constants`] value is built once per run and handed to each component
//! that needs it; nothing here is process-wide state.

/// Immutable naming and sizing conventions for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constants {
    /// Name of the group at the top of every questionnaire tree.
    pub root_group_name: String,
    /// Column holding the respondent identifier in every dataset.
    pub root_identifier_name: String,
    /// Column added during reconciliation to record the collection mode.
    pub mode_variable_name: String,
    /// Suffix of the per-mode bindings built for reconciliation.
    pub keep_suffix: String,
    /// Separator between group names in fully-qualified variable names.
    pub qualified_separator: char,
    /// Field delimiter of paper exports.
    pub paper_delimiter: u8,
    /// Separator between respondent id and loop ordinal in paper identifiers.
    pub paper_instance_separator: char,
    /// Lower bound applied to inferred string lengths.
    pub min_string_length: usize,
    /// Upper bound applied to inferred string lengths.
    pub max_string_length: usize,
    /// Storage length reported for numeric columns.
    pub numeric_length: usize,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            root_group_name: "RACINE".to_string(),
            root_identifier_name: "IdUE".to_string(),
            mode_variable_name: "MODE_KRAFTWERK".to_string(),
            keep_suffix: "_keep".to_string(),
            qualified_separator: '.',
            paper_delimiter: b'#',
            paper_instance_separator: '_',
            min_string_length: 1,
            max_string_length: 32767,
            numeric_length: 8,
        }
    }
}

impl Constants {
    /// Name of the auxiliary binding created for `mode` during reconciliation.
    pub fn keep_binding(&self, mode: &str) -> String {
        format!("{mode}{}", self.keep_suffix)
    }

    /// Clamp an observed string length into the supported range.
    pub fn clamp_string_length(&self, observed: usize) -> usize {
        observed.clamp(self.min_string_length, self.max_string_length)
    }
}
