//! Conversions between raw answer strings and typed cell values.

use polars::prelude::{AnyValue, DataFrame};

/// Text of a cell; `None` for null.
pub fn any_to_string(value: AnyValue) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(value) => Some(value.to_string()),
        AnyValue::StringOwned(value) => Some(value.to_string()),
        AnyValue::Boolean(value) => Some(value.to_string()),
        AnyValue::Float64(value) => Some(format_numeric(value)),
        AnyValue::Float32(value) => Some(format_numeric(f64::from(value))),
        value => Some(value.to_string()),
    }
}

pub fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Text of a cell by column name and row; `None` for null or missing column.
pub fn cell_string(df: &DataFrame, name: &str, idx: usize) -> Option<String> {
    let column = df.column(name).ok()?;
    any_to_string(column.get(idx).unwrap_or(AnyValue::Null))
}

pub fn parse_i64(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(parsed) = value.parse::<i64>() {
        return Some(parsed);
    }
    // Integers exported as decimals ("40.0")
    parse_f64(value)
        .filter(|parsed| parsed.fract() == 0.0 && parsed.abs() < 9.0e15)
        .map(|parsed| parsed as i64)
}

pub fn parse_f64(value: &str) -> Option<f64> {
    let value = value.trim();
    value
        .parse::<f64>()
        .or_else(|_| value.replace(',', ".").parse::<f64>())
        .ok()
        .filter(|parsed| parsed.is_finite())
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Whether a paper flag is ticked.
pub fn is_ticked(value: &str) -> bool {
    parse_bool(value) == Some(true)
}
