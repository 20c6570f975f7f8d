//! Conversion of hierarchical raw data into a flat dataset.
//!
//! The dataset has one row per questionnaire (its root instance) and one row
//! per group instance at any depth. Columns are the root identifier, one
//! identifier column per group, then every variable under its fully-qualified
//! name. A group instance row repeats the identifiers and values of its
//! ancestors.

use std::collections::{BTreeMap, BTreeSet};

use kraftwerk_model::{
    Constants, GroupInstance, Issue, IssueKind, SurveyRawData, Variable, VariableType,
};
use polars::prelude::{Column, DataFrame, NamedFrom, PolarsResult, Series};

use crate::values::{parse_bool, parse_f64, parse_i64};

/// A converted dataset and the coercion problems met on the way.
#[derive(Debug, Clone)]
pub struct DatasetConversion {
    pub frame: DataFrame,
    pub issues: Vec<Issue>,
}

enum ColumnKind<'a> {
    Identifier,
    Value(&'a Variable),
}

struct ColumnSpec<'a> {
    name: String,
    kind: ColumnKind<'a>,
}

type Row = Vec<Option<String>>;

struct RowBuilder<'a> {
    group_columns: BTreeMap<&'a str, usize>,
    /// group -> variable -> column
    variable_columns: BTreeMap<&'a str, BTreeMap<&'a str, usize>>,
    rows: Vec<Row>,
}

impl RowBuilder<'_> {
    fn emit(&mut self, group: &str, instance: &GroupInstance, template: &Row) {
        let mut row = template.clone();
        if let Some(&position) = self.group_columns.get(group) {
            row[position] = Some(instance.id().to_string());
        }
        if let Some(columns) = self.variable_columns.get(group) {
            for (variable, value) in instance.values() {
                if let Some(&position) = columns.get(variable) {
                    row[position] = Some(value.to_string());
                }
            }
        }
        self.rows.push(row.clone());
        for subgroup in instance.subgroups() {
            for child in subgroup.instances() {
                self.emit(subgroup.name(), child, &row);
            }
        }
    }
}

/// Column names of a mode's dataset, in order.
pub fn dataset_columns(data: &SurveyRawData, constants: &Constants) -> Vec<String> {
    column_specs(data, constants)
        .into_iter()
        .map(|spec| spec.name)
        .collect()
}

fn column_specs<'a>(data: &'a SurveyRawData, constants: &Constants) -> Vec<ColumnSpec<'a>> {
    let variables = &data.variables;
    let groups = variables.groups_by_depth();

    let mut specs = vec![ColumnSpec {
        name: constants.root_identifier_name.clone(),
        kind: ColumnKind::Identifier,
    }];
    specs.extend(groups.iter().map(|group| ColumnSpec {
        name: group.name.clone(),
        kind: ColumnKind::Identifier,
    }));

    let group_order = std::iter::once(variables.root_group_name())
        .chain(groups.iter().map(|group| group.name.as_str()));
    for group in group_order {
        for variable in variables.variables_in(group) {
            specs.push(ColumnSpec {
                name: variables.qualified_name(variable),
                kind: ColumnKind::Value(variable),
            });
        }
    }
    specs
}

/// Build the flat dataset of one mode.
pub fn to_dataset(data: &SurveyRawData, constants: &Constants) -> PolarsResult<DatasetConversion> {
    let specs = column_specs(data, constants);

    let mut builder = RowBuilder {
        group_columns: BTreeMap::new(),
        variable_columns: BTreeMap::new(),
        rows: Vec::with_capacity(data.len()),
    };
    for (position, spec) in specs.iter().enumerate().skip(1) {
        match spec.kind {
            ColumnKind::Identifier => {
                builder.group_columns.insert(spec.name.as_str(), position);
            }
            ColumnKind::Value(variable) => {
                builder
                    .variable_columns
                    .entry(variable.group.as_str())
                    .or_default()
                    .insert(variable.name.as_str(), position);
            }
        }
    }

    for questionnaire in &data.questionnaires {
        let mut template: Row = vec![None; specs.len()];
        template[0] = Some(questionnaire.identifier.clone());
        builder.emit(
            data.variables.root_group_name(),
            &questionnaire.answers,
            &template,
        );
    }

    let rows = builder.rows;
    let mut issues = Vec::new();
    // Ancestor values repeat on descendant rows; report each once.
    let mut reported = BTreeSet::new();
    let mut columns = Vec::with_capacity(specs.len());
    for (position, spec) in specs.iter().enumerate() {
        let raw = rows.iter().map(|row| row[position].as_deref());
        let column = match spec.kind {
            ColumnKind::Identifier => Series::new(spec.name.as_str().into(), raw.collect::<Vec<_>>()),
            ColumnKind::Value(variable) => {
                let mut failed = |idx: usize, value: &str| {
                    let identifier = rows[idx][0].clone().unwrap_or_default();
                    if !reported.insert((identifier.clone(), position, value.to_string())) {
                        return;
                    }
                    issues.push(
                        Issue::warning(
                            IssueKind::Record,
                            format!(
                                "value '{value}' of {} is not a valid {}",
                                spec.name, variable.var_type
                            ),
                        )
                        .with_mode(data.mode.as_str())
                        .with_identifier(identifier),
                    );
                };
                typed_series(&spec.name, variable.var_type, raw, &mut failed)
            }
        };
        columns.push(Column::from(column));
    }

    let frame = DataFrame::new(columns)?;
    Ok(DatasetConversion { frame, issues })
}

fn typed_series<'v>(
    name: &str,
    var_type: VariableType,
    raw: impl Iterator<Item = Option<&'v str>>,
    failed: &mut dyn FnMut(usize, &str),
) -> Series {
    fn convert<'v, T>(
        raw: impl Iterator<Item = Option<&'v str>>,
        parse: fn(&str) -> Option<T>,
        failed: &mut dyn FnMut(usize, &str),
    ) -> Vec<Option<T>> {
        raw.enumerate()
            .map(|(idx, value)| {
                let value = value?;
                if value.trim().is_empty() {
                    return None;
                }
                let parsed = parse(value);
                if parsed.is_none() {
                    failed(idx, value);
                }
                parsed
            })
            .collect()
    }

    match var_type {
        VariableType::Integer => Series::new(name.into(), convert(raw, parse_i64, failed)),
        VariableType::Number => Series::new(name.into(), convert(raw, parse_f64, failed)),
        VariableType::Boolean => Series::new(name.into(), convert(raw, parse_bool, failed)),
        VariableType::String | VariableType::Date => {
            Series::new(name.into(), raw.collect::<Vec<_>>())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kraftwerk_model::{Group, PathSegment, VariablesMap};
    use polars::prelude::{AnyValue, DataType};

    fn household() -> SurveyRawData {
        let constants = Constants::default();
        let map = VariablesMap::build(
            &constants,
            vec![
                Group::child("PERSONS", "RACINE"),
                Group::child("CARS", "PERSONS"),
            ],
            vec![
                Variable::new("AGE", "RACINE", VariableType::Integer),
                Variable::new("PRENOM", "PERSONS", VariableType::String),
                Variable::new("CAR_COLOR", "CARS", VariableType::String),
            ],
        )
        .unwrap();
        let mut data = SurveyRawData::new("CAWI", Vec::new(), map);
        let mut q = data.new_questionnaire("U1");
        q.put_value("40", "AGE", &[]);
        q.put_value("Ann", "PRENOM", &[PathSegment::ordinal("PERSONS", 0)]);
        q.put_value(
            "Purple",
            "CAR_COLOR",
            &[
                PathSegment::ordinal("PERSONS", 0),
                PathSegment::ordinal("CARS", 0),
            ],
        );
        data.push(q);
        let mut q = data.new_questionnaire("U2");
        q.put_value("abc", "AGE", &[]);
        data.push(q);
        data
    }

    #[test]
    fn test_columns_are_qualified() {
        let data = household();
        assert_eq!(
            dataset_columns(&data, &Constants::default()),
            vec![
                "IdUE",
                "PERSONS",
                "CARS",
                "AGE",
                "PERSONS.PRENOM",
                "PERSONS.CARS.CAR_COLOR"
            ]
        );
    }

    #[test]
    fn test_rows_per_instance_carry_ancestors() {
        let conversion = to_dataset(&household(), &Constants::default()).unwrap();
        let frame = &conversion.frame;
        // U1 root, U1 person, U1 car, U2 root
        assert_eq!(frame.height(), 4);
        assert_eq!(frame.column("AGE").unwrap().dtype(), &DataType::Int64);

        let car_row = 2;
        assert_eq!(
            frame.column("CARS").unwrap().get(car_row).unwrap(),
            AnyValue::String("CARS-01")
        );
        assert_eq!(
            frame.column("PERSONS").unwrap().get(car_row).unwrap(),
            AnyValue::String("PERSONS-01")
        );
        assert_eq!(
            frame.column("AGE").unwrap().get(car_row).unwrap(),
            AnyValue::Int64(40)
        );
    }

    #[test]
    fn test_coercion_failure_is_null_with_warning() {
        let conversion = to_dataset(&household(), &Constants::default()).unwrap();
        assert_eq!(
            conversion.frame.column("AGE").unwrap().get(3).unwrap(),
            AnyValue::Null
        );
        assert_eq!(conversion.issues.len(), 1);
        assert_eq!(conversion.issues[0].identifier.as_deref(), Some("U2"));
    }

    #[test]
    fn test_same_name_at_two_depths_gets_two_columns() {
        let constants = Constants::default();
        let map = VariablesMap::build(
            &constants,
            vec![Group::child("LOOP", "RACINE")],
            vec![
                Variable::new("FOO", "RACINE", VariableType::String),
                Variable::new("FOO", "LOOP", VariableType::Integer),
            ],
        )
        .unwrap();
        let mut data = SurveyRawData::new("CAWI", Vec::new(), map);
        let mut q = data.new_questionnaire("U1");
        q.put_value("top", "FOO", &[]);
        q.put_value("7", "FOO", &[PathSegment::ordinal("LOOP", 0)]);
        data.push(q);

        assert_eq!(
            dataset_columns(&data, &constants),
            vec!["IdUE", "LOOP", "FOO", "LOOP.FOO"]
        );
        let frame = to_dataset(&data, &constants).unwrap().frame;
        assert_eq!(frame.height(), 2);
        let root_foo = frame.column("FOO").unwrap();
        let loop_foo = frame.column("LOOP.FOO").unwrap();
        assert_eq!(root_foo.get(0).unwrap(), AnyValue::String("top"));
        assert_eq!(loop_foo.get(0).unwrap(), AnyValue::Null);
        assert_eq!(root_foo.get(1).unwrap(), AnyValue::String("top"));
        assert_eq!(loop_foo.get(1).unwrap(), AnyValue::Int64(7));
    }
}
