use serde_json::json;

use super::common::age_definition;
use crate::planning::rules::{
    authoring_facts, BooleanConditionEvaluator, ConditionClause, ConditionEvaluator, FactSet,
    RuleDefinition, RuleEvaluationError, RuleEvent, RuleValidator,
};

fn clause(fact: &str, operator: &str, value: serde_json::Value) -> ConditionClause {
    ConditionClause {
        fact: fact.to_string(),
        operator: operator.to_string(),
        value,
    }
}

fn definition(conditions: Vec<ConditionClause>) -> RuleDefinition {
    RuleDefinition {
        conditions,
        event: RuleEvent {
            kind: "allocation-applies".to_string(),
            params: None,
        },
    }
}

#[test]
fn age_condition_validates_against_authoring_facts() {
    let validator = RuleValidator::new();
    assert!(validator.validate(&age_definition()).is_ok());
}

#[test]
fn unmatched_definition_is_still_valid() {
    // Validation is a smoke test, not a proof the rule fires.
    let validator = RuleValidator::new();
    let definition = definition(vec![clause("beneficiary-age", "greaterThan", json!(30))]);
    assert!(validator.validate(&definition).is_ok());
}

#[test]
fn unknown_operator_is_rejected() {
    let validator = RuleValidator::new();
    let definition = definition(vec![clause("beneficiary-age", "isBetween", json!([18, 30]))]);

    match validator.validate(&definition) {
        Err(RuleEvaluationError::UnknownOperator { operator, .. }) => {
            assert_eq!(operator, "isBetween");
        }
        other => panic!("expected unknown operator rejection, got {other:?}"),
    }
}

#[test]
fn unknown_fact_is_rejected() {
    let validator = RuleValidator::new();
    let definition = definition(vec![clause("favourite-colour", "equal", json!("green"))]);

    assert!(matches!(
        validator.validate(&definition),
        Err(RuleEvaluationError::UnknownFact { .. })
    ));
}

#[test]
fn empty_condition_list_is_rejected() {
    let validator = RuleValidator::new();
    let definition = definition(Vec::new());

    assert!(matches!(
        validator.validate(&definition),
        Err(RuleEvaluationError::EmptyConditions)
    ));
}

#[test]
fn blank_event_type_is_rejected() {
    let validator = RuleValidator::new();
    let mut definition = age_definition();
    definition.event.kind = "   ".to_string();

    assert!(matches!(
        validator.validate(&definition),
        Err(RuleEvaluationError::MissingEventType)
    ));
}

#[test]
fn non_numeric_value_for_numeric_operator_is_rejected() {
    let validator = RuleValidator::new();
    let definition = definition(vec![clause(
        "beneficiary-age",
        "greaterThan",
        json!("eighteen"),
    )]);

    assert!(matches!(
        validator.validate(&definition),
        Err(RuleEvaluationError::IncomparableValue { .. })
    ));
}

#[test]
fn errors_in_later_clauses_surface_even_after_a_failed_clause() {
    let validator = RuleValidator::new();
    let definition = definition(vec![
        clause("beneficiary-age", "greaterThan", json!(99)),
        clause("sobriety-period", "isBetween", json!([0, 400])),
    ]);

    assert!(matches!(
        validator.validate(&definition),
        Err(RuleEvaluationError::UnknownOperator { .. })
    ));
}

#[test]
fn membership_operators_check_the_candidate_list() {
    let validator = RuleValidator::new();

    let in_definition = definition(vec![clause(
        "beneficiary-relationship",
        "in",
        json!(["child", "grandchild"]),
    )]);
    assert!(validator.validate(&in_definition).is_ok());

    let not_in_definition = definition(vec![clause(
        "beneficiary-relationship",
        "notIn",
        json!(["friend"]),
    )]);
    assert!(validator.validate(&not_in_definition).is_ok());

    let scalar_candidates = definition(vec![clause(
        "beneficiary-relationship",
        "in",
        json!("child"),
    )]);
    assert!(matches!(
        validator.validate(&scalar_candidates),
        Err(RuleEvaluationError::IncomparableValue { .. })
    ));
}

#[test]
fn boolean_and_threshold_clauses_compose_with_and() {
    let evaluator = BooleanConditionEvaluator;
    let definition = definition(vec![
        clause("education-completed", "equal", json!(true)),
        clause("sobriety-period", "greaterThanInclusive", json!(365)),
    ]);

    let outcome = evaluator
        .evaluate(&definition, &authoring_facts())
        .expect("evaluates");

    assert!(outcome.matched);
    let event = outcome.event.expect("event emitted on match");
    assert_eq!(event.kind, "allocation-applies");
}

#[test]
fn failed_clause_suppresses_the_event() {
    let evaluator = BooleanConditionEvaluator;
    let definition = definition(vec![
        clause("education-completed", "equal", json!(true)),
        clause("beneficiary-age", "lessThan", json!(21)),
    ]);

    let outcome = evaluator
        .evaluate(&definition, &authoring_facts())
        .expect("evaluates");

    assert!(!outcome.matched);
    assert!(outcome.event.is_none());
}

#[test]
fn contains_handles_list_and_string_facts() {
    let evaluator = BooleanConditionEvaluator;
    let facts = FactSet::new()
        .with("requested-bequests", json!(["house", "savings"]))
        .with("beneficiary-relationship", "grandchild");

    let list_definition = definition(vec![clause("requested-bequests", "contains", json!("house"))]);
    let outcome = evaluator
        .evaluate(&list_definition, &facts)
        .expect("evaluates");
    assert!(outcome.matched);

    let text_definition = definition(vec![clause(
        "beneficiary-relationship",
        "contains",
        json!("child"),
    )]);
    let outcome = evaluator
        .evaluate(&text_definition, &facts)
        .expect("evaluates");
    assert!(outcome.matched);

    let incomparable = definition(vec![clause(
        "beneficiary-relationship",
        "contains",
        json!(42),
    )]);
    assert!(matches!(
        evaluator.evaluate(&incomparable, &facts),
        Err(RuleEvaluationError::IncomparableValue { .. })
    ));
}

#[test]
fn numeric_equality_ignores_representation() {
    let evaluator = BooleanConditionEvaluator;
    let definition = definition(vec![clause("beneficiary-age", "equal", json!(25.0))]);

    let outcome = evaluator
        .evaluate(&definition, &authoring_facts())
        .expect("evaluates");

    assert!(outcome.matched);
}
