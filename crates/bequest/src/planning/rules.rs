use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One clause of a user-authored rule definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionClause {
    pub fact: String,
    pub operator: String,
    pub value: Value,
}

/// Event emitted when every clause of a definition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, Value>>,
}

/// User-authored condition set plus resulting event. Clauses combine with
/// logical AND only; OR composition is not exposed to rule authors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub conditions: Vec<ConditionClause>,
    pub event: RuleEvent,
}

/// Named fact values a definition is executed against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactSet {
    facts: BTreeMap<String, Value>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, fact: &str, value: impl Into<Value>) -> Self {
        self.facts.insert(fact.to_string(), value.into());
        self
    }

    pub fn get(&self, fact: &str) -> Option<&Value> {
        self.facts.get(fact)
    }
}

/// Result of one execution of a rule definition against a fact set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOutcome {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<RuleEvent>,
}

/// Errors raised while validating or executing a rule definition.
#[derive(Debug, thiserror::Error)]
pub enum RuleEvaluationError {
    #[error("rule definition needs at least one condition")]
    EmptyConditions,
    #[error("rule event type must not be empty")]
    MissingEventType,
    #[error("condition on '{fact}' uses unsupported operator '{operator}'")]
    UnknownOperator { fact: String, operator: String },
    #[error("condition references unknown fact '{fact}'")]
    UnknownFact { fact: String },
    #[error("operator '{operator}' cannot compare the value supplied for '{fact}'")]
    IncomparableValue { fact: String, operator: String },
}

/// Narrow seam over the rule engine so evaluator internals never leak into
/// the validation or persistence paths.
pub trait ConditionEvaluator: Send + Sync {
    fn evaluate(
        &self,
        definition: &RuleDefinition,
        facts: &FactSet,
    ) -> Result<RuleOutcome, RuleEvaluationError>;
}

/// AND-combined boolean evaluator covering the operator set exposed to rule
/// authors: `equal`, `notEqual`, `greaterThan`, `greaterThanInclusive`,
/// `lessThan`, `lessThanInclusive`, `in`, `notIn`, and `contains`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConditionEvaluator;

impl ConditionEvaluator for BooleanConditionEvaluator {
    fn evaluate(
        &self,
        definition: &RuleDefinition,
        facts: &FactSet,
    ) -> Result<RuleOutcome, RuleEvaluationError> {
        // Every clause is checked even after one has failed so authoring-time
        // validation surfaces problems in later clauses too.
        let mut matched = true;
        for clause in &definition.conditions {
            if !clause_holds(clause, facts)? {
                matched = false;
            }
        }

        Ok(RuleOutcome {
            matched,
            event: matched.then(|| definition.event.clone()),
        })
    }
}

fn clause_holds(clause: &ConditionClause, facts: &FactSet) -> Result<bool, RuleEvaluationError> {
    let fact_value = facts
        .get(&clause.fact)
        .ok_or_else(|| RuleEvaluationError::UnknownFact {
            fact: clause.fact.clone(),
        })?;

    match clause.operator.as_str() {
        "equal" => Ok(values_equal(fact_value, &clause.value)),
        "notEqual" => Ok(!values_equal(fact_value, &clause.value)),
        "greaterThan" => compare_numeric(clause, fact_value, |lhs, rhs| lhs > rhs),
        "greaterThanInclusive" => compare_numeric(clause, fact_value, |lhs, rhs| lhs >= rhs),
        "lessThan" => compare_numeric(clause, fact_value, |lhs, rhs| lhs < rhs),
        "lessThanInclusive" => compare_numeric(clause, fact_value, |lhs, rhs| lhs <= rhs),
        "in" => membership(clause, fact_value),
        "notIn" => Ok(!membership(clause, fact_value)?),
        "contains" => contains(clause, fact_value),
        _ => Err(RuleEvaluationError::UnknownOperator {
            fact: clause.fact.clone(),
            operator: clause.operator.clone(),
        }),
    }
}

// JSON equality, except numbers compare by value so 25 and 25.0 agree.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(lhs), Some(rhs)) => lhs == rhs,
        _ => lhs == rhs,
    }
}

fn compare_numeric(
    clause: &ConditionClause,
    fact_value: &Value,
    ordering: impl Fn(f64, f64) -> bool,
) -> Result<bool, RuleEvaluationError> {
    match (fact_value.as_f64(), clause.value.as_f64()) {
        (Some(lhs), Some(rhs)) => Ok(ordering(lhs, rhs)),
        _ => Err(RuleEvaluationError::IncomparableValue {
            fact: clause.fact.clone(),
            operator: clause.operator.clone(),
        }),
    }
}

fn membership(clause: &ConditionClause, fact_value: &Value) -> Result<bool, RuleEvaluationError> {
    let Some(candidates) = clause.value.as_array() else {
        return Err(RuleEvaluationError::IncomparableValue {
            fact: clause.fact.clone(),
            operator: clause.operator.clone(),
        });
    };

    Ok(candidates
        .iter()
        .any(|candidate| values_equal(fact_value, candidate)))
}

fn contains(clause: &ConditionClause, fact_value: &Value) -> Result<bool, RuleEvaluationError> {
    match fact_value {
        Value::Array(items) => Ok(items.iter().any(|item| values_equal(item, &clause.value))),
        Value::String(text) => clause
            .value
            .as_str()
            .map(|needle| text.contains(needle))
            .ok_or_else(|| RuleEvaluationError::IncomparableValue {
                fact: clause.fact.clone(),
                operator: clause.operator.clone(),
            }),
        _ => Err(RuleEvaluationError::IncomparableValue {
            fact: clause.fact.clone(),
            operator: clause.operator.clone(),
        }),
    }
}

/// Fixed fact set a definition is dry-run against at authoring time. The
/// values are representative, not real beneficiary data; executing against
/// them only proves the definition evaluates without erroring.
pub fn authoring_facts() -> FactSet {
    FactSet::new()
        .with("beneficiary-age", 25)
        .with("education-completed", true)
        .with("sobriety-period", 365)
        .with("beneficiary-relationship", "child")
}

/// Rejects malformed rule definitions before persistence by executing them
/// once against [`authoring_facts`].
pub struct RuleValidator {
    evaluator: Arc<dyn ConditionEvaluator>,
}

impl RuleValidator {
    pub fn new() -> Self {
        Self::with_evaluator(Arc::new(BooleanConditionEvaluator))
    }

    pub fn with_evaluator(evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Structural checks first, then one dry-run execution. A definition that
    /// fails to match is still valid; only evaluation errors reject it.
    pub fn validate(&self, definition: &RuleDefinition) -> Result<(), RuleEvaluationError> {
        if definition.conditions.is_empty() {
            return Err(RuleEvaluationError::EmptyConditions);
        }
        if definition.event.kind.trim().is_empty() {
            return Err(RuleEvaluationError::MissingEventType);
        }

        self.evaluator
            .evaluate(definition, &authoring_facts())
            .map(|_| ())
    }
}

impl Default for RuleValidator {
    fn default() -> Self {
        Self::new()
    }
}
