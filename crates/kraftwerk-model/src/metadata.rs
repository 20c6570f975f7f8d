//! Questionnaire metadata for one collection mode.
//!
//! A [`VariablesMap`] describes which variables a questionnaire collects and
//! how its repeatable groups nest. Groups form a tree rooted at the reserved
//! root group; every variable belongs to exactly one group.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::Constants;
use crate::error::{ModelError, Result};
use crate::raw_data::PathSegment;

/// Declared type of a variable. Raw values are always strings; the type only
/// drives coercion when datasets are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariableType {
    String,
    Integer,
    Number,
    Boolean,
    Date,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::String => "STRING",
            VariableType::Integer => "INTEGER",
            VariableType::Number => "NUMBER",
            VariableType::Boolean => "BOOLEAN",
            VariableType::Date => "DATE",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, VariableType::Integer | VariableType::Number)
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableType {
    type Err = ModelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "STRING" => Ok(VariableType::String),
            "INTEGER" => Ok(VariableType::Integer),
            "NUMBER" => Ok(VariableType::Number),
            "BOOLEAN" => Ok(VariableType::Boolean),
            "DATE" => Ok(VariableType::Date),
            _ => Err(ModelError::InvalidVariableType(s.to_string())),
        }
    }
}

/// Link from a paper flag variable to the unique-choice question it encodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UcqModality {
    /// Logical question name (e.g. `GENDER`).
    pub question: String,
    /// Modality value the flag stands for (e.g. `"2"`).
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub group: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    #[serde(default)]
    pub length: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// Set on paper flag variables only.
    #[serde(default, rename = "ucq")]
    pub paper_ucq: Option<UcqModality>,
}

impl Variable {
    pub fn new(name: impl Into<String>, group: impl Into<String>, var_type: VariableType) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            var_type,
            length: None,
            format: None,
            paper_ucq: None,
        }
    }

    pub fn with_length(mut self, length: impl Into<String>) -> Self {
        self.length = Some(length.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Mark this variable as the flag of `question` for modality `value`.
    pub fn with_ucq(mut self, question: impl Into<String>, value: impl Into<String>) -> Self {
        self.paper_ucq = Some(UcqModality {
            question: question.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_ucq_flag(&self) -> bool {
        self.paper_ucq.is_some()
    }

    /// Declared length as a number, when it parses as one.
    ///
    /// Lengths such as `"1.0"` are accepted; fractional parts are dropped.
    pub fn declared_length(&self) -> Option<usize> {
        let raw = self.length.as_deref()?.trim();
        let integral = raw.split('.').next().unwrap_or(raw);
        integral.parse::<usize>().ok().filter(|len| *len > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
}

impl Group {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
        }
    }

    pub fn child(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
        }
    }
}

/// Variables and groups of one mode's questionnaire.
///
/// A variable name is unique within its group only. `FOO` at the root and
/// `FOO` in `LOOP` are two variables, told apart by their fully qualified
/// names `FOO` and `LOOP.FOO`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablesMap {
    root: String,
    separator: char,
    /// Column names the pipeline adds itself.
    reserved: BTreeSet<String>,
    groups: BTreeMap<String, Group>,
    /// Keyed by (group, name).
    variables: BTreeMap<(String, String), Variable>,
}

impl VariablesMap {
    /// Create a map holding only the root group.
    pub fn new(constants: &Constants) -> Self {
        let root = constants.root_group_name.clone();
        let mut groups = BTreeMap::new();
        groups.insert(root.clone(), Group::root(root.clone()));
        Self {
            root,
            separator: constants.qualified_separator,
            reserved: BTreeSet::from([
                constants.root_identifier_name.clone(),
                constants.mode_variable_name.clone(),
            ]),
            groups,
            variables: BTreeMap::new(),
        }
    }

    /// Build a map and check the group tree.
    ///
    /// Groups may be given in any order. The root group is added when missing.
    /// Cycles, unknown parents, a second parentless group, variables in
    /// unknown groups and names shared between a group, a variable or the
    /// identifier columns are rejected here rather than discovered during
    /// parsing.
    pub fn build(
        constants: &Constants,
        groups: impl IntoIterator<Item = Group>,
        variables: impl IntoIterator<Item = Variable>,
    ) -> Result<Self> {
        let mut map = Self::new(constants);
        for group in groups {
            if group.name == map.root {
                if let Some(parent) = group.parent {
                    return Err(ModelError::RootWithParent(parent));
                }
                continue;
            }
            if group.parent.is_none() {
                return Err(ModelError::SecondRoot(group.name));
            }
            map.check_group_name(&group.name)?;
            map.groups.insert(group.name.clone(), group);
        }
        for group in map.groups.values() {
            map.check_ancestry(group)?;
        }
        for variable in variables {
            map.insert_variable(variable)?;
        }
        Ok(map)
    }

    /// Add or replace a group. The parent must already be known and the new
    /// parent link must not close a cycle.
    pub fn put_group(&mut self, group: Group) -> Result<()> {
        if group.name == self.root {
            return match group.parent {
                Some(parent) => Err(ModelError::RootWithParent(parent)),
                None => Ok(()),
            };
        }
        if group.parent.is_none() {
            return Err(ModelError::SecondRoot(group.name));
        }
        self.check_group_name(&group.name)?;
        if self.variables.values().any(|var| var.name == group.name) {
            return Err(ModelError::NameCollision {
                name: group.name,
                used_as: "a variable".to_string(),
            });
        }
        self.check_ancestry(&group)?;
        self.groups.insert(group.name.clone(), group);
        Ok(())
    }

    /// Add or replace a variable of a known group.
    pub fn put_variable(&mut self, variable: Variable) -> Result<()> {
        if !self.groups.contains_key(&variable.group) {
            return Err(ModelError::UnknownGroup {
                variable: variable.name,
                group: variable.group,
            });
        }
        if self.groups.contains_key(&variable.name) {
            return Err(ModelError::NameCollision {
                name: variable.name,
                used_as: "a group".to_string(),
            });
        }
        if self.reserved.contains(&variable.name) {
            return Err(ModelError::NameCollision {
                name: variable.name,
                used_as: "an identifier column".to_string(),
            });
        }
        self.variables
            .insert((variable.group.clone(), variable.name.clone()), variable);
        Ok(())
    }

    fn insert_variable(&mut self, variable: Variable) -> Result<()> {
        if self.variable_in(&variable.group, &variable.name).is_some() {
            return Err(ModelError::DuplicateVariable {
                variable: variable.name,
                group: variable.group,
            });
        }
        self.put_variable(variable)
    }

    fn check_group_name(&self, name: &str) -> Result<()> {
        if self.reserved.contains(name) {
            return Err(ModelError::NameCollision {
                name: name.to_string(),
                used_as: "an identifier column".to_string(),
            });
        }
        Ok(())
    }

    /// Walk the parent chain of `group` (using its own parent link, the rest
    /// from the map) and reject unknown parents and cycles.
    fn check_ancestry(&self, group: &Group) -> Result<()> {
        let mut chain = vec![group.name.clone()];
        let mut seen = BTreeSet::from([group.name.clone()]);
        let mut parent = group.parent.clone();
        while let Some(name) = parent {
            if name == self.root {
                return Ok(());
            }
            if !seen.insert(name.clone()) {
                chain.push(name);
                return Err(ModelError::CyclicGroup {
                    group: group.name.clone(),
                    chain,
                });
            }
            let Some(next) = self.groups.get(&name) else {
                return Err(ModelError::UnknownParent {
                    group: chain.last().cloned().unwrap_or_default(),
                    parent: name,
                });
            };
            chain.push(name);
            parent = next.parent.clone();
        }
        Ok(())
    }

    pub fn root_group_name(&self) -> &str {
        &self.root
    }

    /// Look a variable up by fully qualified name (`LOOP.FOO`) or bare name.
    /// A bare name declared in several groups resolves to the shallowest.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        match name.rsplit_once(self.separator) {
            Some((prefix, own)) => {
                let group = prefix
                    .rsplit_once(self.separator)
                    .map_or(prefix, |(_, last)| last);
                self.variable_in(group, own)
                    .filter(|variable| self.qualified_name(variable) == name)
            }
            None => self.variables_named(name).into_iter().next(),
        }
    }

    pub fn variable_in(&self, group: &str, name: &str) -> Option<&Variable> {
        self.variables.get(&(group.to_string(), name.to_string()))
    }

    /// Every variable called `name`, shallowest group first.
    pub fn variables_named(&self, name: &str) -> Vec<&Variable> {
        let mut found: Vec<&Variable> = self
            .variables
            .values()
            .filter(|var| var.name == name)
            .collect();
        found.sort_by_key(|var| self.depth(&var.group));
        found
    }

    /// The variable a data file means by a bare `name` found under `levels`
    /// nested arrays: the one whose group is exactly that deep, else the
    /// shallowest deeper one, else the deepest declared.
    pub fn resolve_variable(&self, name: &str, levels: usize) -> Option<&Variable> {
        let candidates = self.variables_named(name);
        candidates
            .iter()
            .copied()
            .find(|var| self.depth(&var.group) >= levels)
            .or_else(|| candidates.last().copied())
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    /// All variables, ordered by group then name.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Non-root groups ordered by depth, then by name.
    pub fn groups_by_depth(&self) -> Vec<&Group> {
        let mut groups: Vec<&Group> = self
            .groups
            .values()
            .filter(|group| group.name != self.root)
            .collect();
        groups.sort_by(|a, b| {
            self.depth(&a.name)
                .cmp(&self.depth(&b.name))
                .then_with(|| a.name.cmp(&b.name))
        });
        groups
    }

    pub fn variables_in<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a Variable> + 'a {
        self.variables.values().filter(move |var| var.group == group)
    }

    pub fn subgroups<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a Group> + 'a {
        self.groups
            .values()
            .filter(move |candidate| candidate.parent.as_deref() == Some(group))
    }

    /// Non-root groups from depth 1 down to `group` itself.
    ///
    /// Empty for the root group and for unknown groups.
    pub fn group_chain(&self, group: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self.groups.get(group);
        while let Some(found) = current {
            if found.name == self.root {
                break;
            }
            chain.push(found.name.as_str());
            current = found.parent.as_deref().and_then(|p| self.groups.get(p));
        }
        chain.reverse();
        chain
    }

    /// Nesting depth of a group; the root is at depth 0.
    pub fn depth(&self, group: &str) -> usize {
        self.group_chain(group).len()
    }

    /// Root-relative dotted name: `LOOP.SUB.X` for `X` in `SUB` under
    /// `LOOP`, plain `X` for a root variable.
    pub fn qualified_name(&self, variable: &Variable) -> String {
        let mut qualified = String::new();
        for group in self.group_chain(&variable.group) {
            qualified.push_str(group);
            qualified.push(self.separator);
        }
        qualified.push_str(&variable.name);
        qualified
    }

    /// [`Self::qualified_name`] of the variable [`Self::variable`] finds.
    pub fn fully_qualified_name(&self, name: &str) -> Option<String> {
        self.variable(name).map(|variable| self.qualified_name(variable))
    }

    /// Path from the root to the instance holding `variable`, using the given
    /// ordinals for the successive groups of its chain. Missing ordinals
    /// default to 0; extra ordinals are ignored.
    pub fn path_for(&self, variable: &Variable, ordinals: &[usize]) -> Vec<PathSegment> {
        self.group_chain(&variable.group)
            .into_iter()
            .enumerate()
            .map(|(idx, group)| PathSegment::ordinal(group, ordinals.get(idx).copied().unwrap_or(0)))
            .collect()
    }

    /// Paper flag variables.
    pub fn ucq_flags(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values().filter(|var| var.is_ucq_flag())
    }

    /// Unique-choice questions keyed by (group, question), flags in name
    /// order.
    pub fn ucq_questions(&self) -> BTreeMap<(&str, &str), Vec<&Variable>> {
        let mut questions: BTreeMap<(&str, &str), Vec<&Variable>> = BTreeMap::new();
        for flag in self.ucq_flags() {
            if let Some(ucq) = &flag.paper_ucq {
                questions
                    .entry((flag.group.as_str(), ucq.question.as_str()))
                    .or_default()
                    .push(flag);
            }
        }
        questions
    }

    /// Merge another mode's metadata into this one. Known groups and
    /// variables are kept as they are.
    pub fn absorb(&mut self, other: &VariablesMap) -> Result<()> {
        for group in other.groups_by_depth() {
            if !self.groups.contains_key(&group.name) {
                self.put_group(group.clone())?;
            }
        }
        for variable in other.variables() {
            if self.variable_in(&variable.group, &variable.name).is_none() {
                self.put_variable(variable.clone())?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constants() -> Constants {
        Constants::default()
    }

    #[test]
    fn cyclic_groups_are_rejected_at_build() {
        let groups = vec![
            Group::child("A", "B"),
            Group::child("B", "C"),
            Group::child("C", "A"),
        ];
        let err = VariablesMap::build(&constants(), groups, Vec::new()).unwrap_err();
        assert!(matches!(err, ModelError::CyclicGroup { .. }));
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let err = VariablesMap::build(&constants(), vec![Group::child("A", "A")], Vec::new())
            .unwrap_err();
        assert!(matches!(err, ModelError::CyclicGroup { .. }));
    }

    #[test]
    fn second_root_is_rejected() {
        let err =
            VariablesMap::build(&constants(), vec![Group::root("OTHER")], Vec::new()).unwrap_err();
        assert_eq!(err, ModelError::SecondRoot("OTHER".to_string()));
    }

    #[test]
    fn put_group_cannot_close_a_cycle() {
        let mut map = VariablesMap::build(
            &constants(),
            vec![Group::child("A", "RACINE"), Group::child("B", "A")],
            Vec::new(),
        )
        .unwrap();
        let err = map.put_group(Group::child("A", "B")).unwrap_err();
        assert!(matches!(err, ModelError::CyclicGroup { .. }));
    }

    #[test]
    fn variable_in_unknown_group_is_rejected() {
        let err = VariablesMap::build(
            &constants(),
            Vec::new(),
            vec![Variable::new("X", "NOWHERE", VariableType::String)],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::UnknownGroup { .. }));
    }

    #[test]
    fn declared_length_accepts_decimal_notation() {
        let var = Variable::new("X", "RACINE", VariableType::String).with_length("12.0");
        assert_eq!(var.declared_length(), Some(12));
        let var = Variable::new("X", "RACINE", VariableType::String).with_length("abc");
        assert_eq!(var.declared_length(), None);
    }

    fn loop_map() -> VariablesMap {
        VariablesMap::build(
            &constants(),
            vec![Group::child("LOOP", "RACINE")],
            vec![
                Variable::new("FOO", "RACINE", VariableType::String),
                Variable::new("FOO", "LOOP", VariableType::Integer),
            ],
        )
        .unwrap()
    }

    #[test]
    fn same_name_in_two_groups_is_two_variables() {
        let map = loop_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map.variable("FOO").unwrap().group, "RACINE");
        assert_eq!(map.variable("LOOP.FOO").unwrap().group, "LOOP");
        assert_eq!(map.variable("RACINE.FOO"), None);
        let names: Vec<String> = map.variables().map(|var| map.qualified_name(var)).collect();
        assert_eq!(names, vec!["LOOP.FOO", "FOO"]);
    }

    #[test]
    fn resolve_variable_prefers_the_group_matching_the_nesting() {
        let map = loop_map();
        assert_eq!(map.resolve_variable("FOO", 0).unwrap().group, "RACINE");
        assert_eq!(map.resolve_variable("FOO", 1).unwrap().group, "LOOP");
        // Deeper than anything declared: the deepest candidate.
        assert_eq!(map.resolve_variable("FOO", 3).unwrap().group, "LOOP");
        assert!(map.resolve_variable("BAR", 0).is_none());
    }

    #[test]
    fn duplicate_variable_in_one_group_is_rejected() {
        let err = VariablesMap::build(
            &constants(),
            Vec::new(),
            vec![
                Variable::new("X", "RACINE", VariableType::String),
                Variable::new("X", "RACINE", VariableType::Integer),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateVariable {
                variable: "X".to_string(),
                group: "RACINE".to_string(),
            }
        );
    }

    #[test]
    fn variable_named_like_a_group_is_rejected() {
        let err = VariablesMap::build(
            &constants(),
            vec![Group::child("PERSONS", "RACINE")],
            vec![Variable::new("PERSONS", "RACINE", VariableType::String)],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::NameCollision { ref name, .. } if name == "PERSONS"));

        let mut map = VariablesMap::build(
            &constants(),
            Vec::new(),
            vec![Variable::new("PERSONS", "RACINE", VariableType::String)],
        )
        .unwrap();
        let err = map.put_group(Group::child("PERSONS", "RACINE")).unwrap_err();
        assert!(matches!(err, ModelError::NameCollision { .. }));
    }

    #[test]
    fn identifier_columns_cannot_be_declared() {
        let err = VariablesMap::build(
            &constants(),
            Vec::new(),
            vec![Variable::new("IdUE", "RACINE", VariableType::String)],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::NameCollision { ref name, .. } if name == "IdUE"));
        let err = VariablesMap::build(
            &constants(),
            vec![Group::child("MODE_KRAFTWERK", "RACINE")],
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::NameCollision { .. }));
    }
}
