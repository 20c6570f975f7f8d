//! Column types and storage lengths of output tables.
//!
//! Downstream script generators (SAS, R) read these descriptions to declare
//! the imported columns.

use kraftwerk_model::{Constants, VariableType, VariablesMap};
use polars::prelude::{AnyValue, DataFrame, DataType};
use serde::{Deserialize, Serialize};

use kraftwerk_core::values::any_to_string;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,
    pub rows: usize,
    pub columns: Vec<ColumnDescription>,
}

fn type_of(dtype: &DataType, declared: Option<VariableType>) -> VariableType {
    match dtype {
        DataType::Boolean => VariableType::Boolean,
        dtype if dtype.is_integer() => VariableType::Integer,
        dtype if dtype.is_float() => VariableType::Number,
        _ if declared == Some(VariableType::Date) => VariableType::Date,
        _ => VariableType::String,
    }
}

/// Longest value of a column, in characters.
fn longest_value(frame: &DataFrame, name: &str) -> usize {
    let Ok(column) = frame.column(name) else {
        return 0;
    };
    (0..frame.height())
        .filter_map(|idx| any_to_string(column.get(idx).unwrap_or(AnyValue::Null)))
        .map(|text| text.trim_end().chars().count())
        .max()
        .unwrap_or(0)
}

/// Describe every column of a table.
///
/// A length declared in the metadata wins. Otherwise numeric and boolean
/// columns get the fixed numeric length, and string columns the longest
/// observed value, clamped to the supported range.
pub fn describe_table(
    name: &str,
    frame: &DataFrame,
    metadata: &VariablesMap,
    constants: &Constants,
) -> TableDescription {
    let columns = frame
        .get_columns()
        .iter()
        .map(|column| {
            let column_name = column.name().to_string();
            // Level tables use bare names of their own group.
            let variable = metadata
                .variable_in(name, &column_name)
                .or_else(|| metadata.variable(&column_name));
            let var_type = type_of(column.dtype(), variable.map(|v| v.var_type));
            let length = match variable.and_then(|v| v.declared_length()) {
                Some(length) => length,
                None if var_type.is_numeric() || var_type == VariableType::Boolean => {
                    constants.numeric_length
                }
                None => constants.clamp_string_length(longest_value(frame, &column_name)),
            };
            ColumnDescription {
                name: column_name,
                var_type,
                length,
            }
        })
        .collect();

    TableDescription {
        name: name.to_string(),
        rows: frame.height(),
        columns,
    }
}
