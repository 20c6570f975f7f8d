//! Tests for kraftwerk-model types.

use kraftwerk_model::{
    Constants, Group, Issue, IssueKind, PathSegment, QuestionnaireData, RunOutcome, RunStatus,
    Variable, VariableType, VariablesMap,
};
use proptest::prelude::*;

fn household_map() -> VariablesMap {
    let constants = Constants::default();
    VariablesMap::build(
        &constants,
        vec![
            Group::child("PERSONS", "RACINE"),
            Group::child("CARS", "PERSONS"),
        ],
        vec![
            Variable::new("LAST_NAME", "RACINE", VariableType::String),
            Variable::new("AGE", "PERSONS", VariableType::Integer),
            Variable::new("CAR_COLOR", "CARS", VariableType::String),
            Variable::new("GENDER_1", "RACINE", VariableType::Boolean).with_ucq("GENDER", "1"),
            Variable::new("GENDER_2", "RACINE", VariableType::Boolean).with_ucq("GENDER", "2"),
        ],
    )
    .expect("valid metadata")
}

#[test]
fn fully_qualified_names_follow_the_group_chain() {
    let map = household_map();
    assert_eq!(map.fully_qualified_name("LAST_NAME").as_deref(), Some("LAST_NAME"));
    assert_eq!(map.fully_qualified_name("AGE").as_deref(), Some("PERSONS.AGE"));
    assert_eq!(
        map.fully_qualified_name("CAR_COLOR").as_deref(),
        Some("PERSONS.CARS.CAR_COLOR")
    );
    assert_eq!(map.fully_qualified_name("UNKNOWN"), None);
}

#[test]
fn group_chain_and_depth() {
    let map = household_map();
    assert_eq!(map.group_chain("CARS"), vec!["PERSONS", "CARS"]);
    assert_eq!(map.depth("RACINE"), 0);
    assert_eq!(map.depth("CARS"), 2);
    let names: Vec<&str> = map.groups_by_depth().iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["PERSONS", "CARS"]);
}

#[test]
fn ucq_questions_group_flags_by_question() {
    let map = household_map();
    let questions = map.ucq_questions();
    assert_eq!(questions.len(), 1);
    let (key, flags) = questions.iter().next().unwrap();
    assert_eq!(*key, ("RACINE", "GENDER"));
    let flags: Vec<&str> = flags.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(flags, vec!["GENDER_1", "GENDER_2"]);
}

#[test]
fn absorb_adds_missing_groups_and_variables() {
    let constants = Constants::default();
    let mut merged = VariablesMap::build(
        &constants,
        Vec::new(),
        vec![Variable::new("LAST_NAME", "RACINE", VariableType::String)],
    )
    .unwrap();
    merged.absorb(&household_map()).unwrap();
    assert!(merged.group("CARS").is_some());
    assert!(merged.has_variable("CAR_COLOR"));
    assert_eq!(merged.len(), 5);
}

#[test]
fn absorb_keeps_same_named_variables_of_other_groups() {
    let constants = Constants::default();
    let mut merged = VariablesMap::build(
        &constants,
        Vec::new(),
        vec![Variable::new("AGE", "RACINE", VariableType::Integer)],
    )
    .unwrap();
    merged.absorb(&household_map()).unwrap();
    assert_eq!(merged.len(), 6);
    assert_eq!(merged.fully_qualified_name("AGE").as_deref(), Some("AGE"));
    assert_eq!(
        merged.fully_qualified_name("PERSONS.AGE").as_deref(),
        Some("PERSONS.AGE")
    );
}

#[test]
fn path_for_fills_missing_ordinals_with_zero() {
    let map = household_map();
    let color = map.variable("CAR_COLOR").unwrap();
    let path = map.path_for(color, &[2]);
    assert_eq!(
        path,
        vec![PathSegment::ordinal("PERSONS", 2), PathSegment::ordinal("CARS", 0)]
    );
}

#[test]
fn variables_map_deserializes_from_metadata_json() {
    let json = r#"{"name": "GENDER_1", "group": "RACINE", "type": "BOOLEAN",
                   "ucq": {"question": "GENDER", "value": "1"}}"#;
    let variable: Variable = serde_json::from_str(json).unwrap();
    assert!(variable.is_ucq_flag());
    assert_eq!(variable.var_type, VariableType::Boolean);
}

#[test]
fn outcome_reports_first_fatal_issue() {
    let mut outcome = RunOutcome::default();
    outcome
        .issues
        .push(Issue::warning(IssueKind::Record, "bad record"));
    assert_eq!(outcome.status(), RunStatus::Success { warnings: 1 });
    outcome
        .issues
        .push(Issue::fatal(IssueKind::Io, "missing file").with_mode("PAPI"));
    outcome
        .issues
        .push(Issue::fatal(IssueKind::MissingDataset, "no multimode"));
    match outcome.status() {
        RunStatus::Failure(issue) => assert_eq!(issue.kind, IssueKind::Io),
        other => panic!("unexpected status {other:?}"),
    }
    assert!(!outcome.is_success());
}

fn segment_strategy() -> impl Strategy<Value = PathSegment> {
    ("[A-Z]{1,6}", 0usize..40).prop_map(|(group, ordinal)| PathSegment::ordinal(group, ordinal))
}

proptest! {
    #[test]
    fn put_then_get_returns_the_value(
        value in ".*",
        variable in "[A-Z][A-Z0-9_]{0,10}",
        path in prop::collection::vec(segment_strategy(), 0..4),
    ) {
        let mut questionnaire = QuestionnaireData::new("ID", "RACINE");
        questionnaire.put_value(value.clone(), variable.clone(), &path);
        prop_assert_eq!(questionnaire.get_value(&variable, &path), Some(value.as_str()));
    }

    #[test]
    fn instance_ids_are_two_digit_padded(ordinal in 0usize..500) {
        let id = kraftwerk_model::instance_id("LOOP", ordinal);
        let number = id.strip_prefix("LOOP-").unwrap();
        prop_assert_eq!(number.trim_start_matches('0').parse::<usize>().unwrap(), ordinal + 1);
        if ordinal < 9 {
            prop_assert_eq!(number.len(), 2);
        } else {
            prop_assert!(!number.starts_with('0'));
        }
    }
}
