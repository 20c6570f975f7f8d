//! Hierarchical raw answers of respondents.
//!
//! One respondent is a tree: the root [`GroupInstance`] holds root-level
//! values and, per sub-group, a [`GroupData`] with one instance per loop
//! iteration. Values are kept as strings; typing happens when datasets are
//! built.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::metadata::VariablesMap;

/// Identifier of the `ordinal`-th (0-based) instance of `group`.
///
/// Ordinals up to 8 are zero-padded (`LOOP-01` .. `LOOP-09`); from ordinal 9
/// on the number is written as is (`LOOP-10`, `LOOP-11`, ...). Downstream
/// joins rely on this exact form.
pub fn instance_id(group: &str, ordinal: usize) -> String {
    let number = ordinal + 1;
    if number < 10 {
        format!("{group}-0{number}")
    } else {
        format!("{group}-{number}")
    }
}

/// How one step of a path designates an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Ordinal(usize),
    Id(String),
}

/// One (group, instance) step from a parent instance to a child instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub group: String,
    pub step: PathStep,
}

impl PathSegment {
    pub fn ordinal(group: impl Into<String>, ordinal: usize) -> Self {
        Self {
            group: group.into(),
            step: PathStep::Ordinal(ordinal),
        }
    }

    pub fn id(group: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            step: PathStep::Id(id.into()),
        }
    }

    pub fn instance_id(&self) -> String {
        match &self.step {
            PathStep::Ordinal(ordinal) => instance_id(&self.group, *ordinal),
            PathStep::Id(id) => id.clone(),
        }
    }
}

/// One concrete occurrence of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupInstance {
    id: String,
    values: BTreeMap<String, String>,
    subgroups: BTreeMap<String, GroupData>,
}

impl GroupInstance {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: BTreeMap::new(),
            subgroups: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set a value on this instance.
    pub fn set(&mut self, variable: impl Into<String>, value: impl Into<String>) {
        self.values.insert(variable.into(), value.into());
    }

    /// Value of a variable on this instance. `None` means the variable was
    /// never answered, which is different from `Some("")`.
    pub fn value(&self, variable: &str) -> Option<&str> {
        self.values.get(variable).map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn subgroup(&self, name: &str) -> Option<&GroupData> {
        self.subgroups.get(name)
    }

    pub fn subgroups(&self) -> impl Iterator<Item = &GroupData> {
        self.subgroups.values()
    }

    /// Instance reached by `path`, created with every intermediate node when
    /// missing.
    pub fn ensure_path(&mut self, path: &[PathSegment]) -> &mut GroupInstance {
        let mut current = self;
        for segment in path {
            current = current
                .subgroups
                .entry(segment.group.clone())
                .or_insert_with(|| GroupData::new(segment.group.clone()))
                .ensure_instance(segment.instance_id());
        }
        current
    }

    /// Instance reached by `path`, if every step already exists. Never
    /// modifies the tree.
    pub fn lookup(&self, path: &[PathSegment]) -> Option<&GroupInstance> {
        let mut current = self;
        for segment in path {
            current = current
                .subgroups
                .get(&segment.group)?
                .instance(&segment.instance_id())?;
        }
        Some(current)
    }

    pub fn put_value(
        &mut self,
        value: impl Into<String>,
        variable: impl Into<String>,
        path: &[PathSegment],
    ) {
        self.ensure_path(path).set(variable, value);
    }

    pub fn get_value(&self, variable: &str, path: &[PathSegment]) -> Option<&str> {
        self.lookup(path)?.value(variable)
    }
}

/// Instances of one group under one parent instance, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupData {
    name: String,
    instances: Vec<GroupInstance>,
}

impl GroupData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance(&self, id: &str) -> Option<&GroupInstance> {
        self.instances.iter().find(|instance| instance.id == id)
    }

    /// Instance with the given id, created when absent.
    pub fn ensure_instance(&mut self, id: String) -> &mut GroupInstance {
        let position = match self.instances.iter().position(|instance| instance.id == id) {
            Some(position) => position,
            None => {
                self.instances.push(GroupInstance::new(id));
                self.instances.len() - 1
            }
        };
        &mut self.instances[position]
    }

    pub fn instances(&self) -> impl Iterator<Item = &GroupInstance> {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Answers of one respondent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionnaireData {
    pub identifier: String,
    pub answers: GroupInstance,
}

impl QuestionnaireData {
    pub fn new(identifier: impl Into<String>, root_group_name: &str) -> Self {
        Self {
            identifier: identifier.into(),
            answers: GroupInstance::new(root_group_name),
        }
    }

    pub fn put_value(
        &mut self,
        value: impl Into<String>,
        variable: impl Into<String>,
        path: &[PathSegment],
    ) {
        self.answers.put_value(value, variable, path);
    }

    pub fn get_value(&self, variable: &str, path: &[PathSegment]) -> Option<&str> {
        self.answers.get_value(variable, path)
    }
}

/// Everything parsed for one collection mode.
#[derive(Debug, Clone)]
pub struct SurveyRawData {
    pub mode: String,
    pub data_files: Vec<PathBuf>,
    pub variables: VariablesMap,
    pub questionnaires: Vec<QuestionnaireData>,
}

impl SurveyRawData {
    pub fn new(mode: impl Into<String>, data_files: Vec<PathBuf>, variables: VariablesMap) -> Self {
        Self {
            mode: mode.into(),
            data_files,
            variables,
            questionnaires: Vec::new(),
        }
    }

    pub fn push(&mut self, questionnaire: QuestionnaireData) {
        self.questionnaires.push(questionnaire);
    }

    /// Start a questionnaire rooted at this mode's root group.
    pub fn new_questionnaire(&self, identifier: impl Into<String>) -> QuestionnaireData {
        QuestionnaireData::new(identifier, self.variables.root_group_name())
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.questionnaires.iter().map(|q| q.identifier.as_str())
    }

    pub fn len(&self) -> usize {
        self.questionnaires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questionnaires.is_empty()
    }
}
