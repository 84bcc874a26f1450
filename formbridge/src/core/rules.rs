//! Conditional visibility for questions.
//!
//! Every condition reads the full answers snapshot, so a question may depend on
//! answers to questions that come later in the form.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::form::{Condition, ConditionalRules, Form, Logic, Operator};
use crate::core::types::AnswersMap;

/// Decide whether a question with `rules` is shown for `answers`.
///
/// - No rules or no conditions: visible.
/// - Equality is JSON equality with numbers compared by value.
/// - A condition whose referenced answer is missing or `null` is false for
///   every operator, `notEquals` included.
/// - Unknown operators make their condition false.
/// - `AND` needs every condition, `OR` needs one; any other logic value is
///   treated as visible.
pub fn is_visible(rules: Option<&ConditionalRules>, answers: &AnswersMap) -> bool {
    let Some(rules) = rules else {
        return true;
    };
    if rules.conditions.is_empty() {
        return true;
    }

    let mut results = rules
        .conditions
        .iter()
        .map(|condition| condition_holds(condition, answers));

    match rules.logic {
        Logic::And => results.all(|held| held),
        Logic::Or => results.any(|held| held),
        Logic::Other(_) => true,
    }
}

/// Visibility of every question in `form`, keyed by question key.
pub fn visibility_map(form: &Form, answers: &AnswersMap) -> BTreeMap<String, bool> {
    form.questions
        .iter()
        .map(|question| {
            (
                question.key.clone(),
                is_visible(question.conditional_rules.as_ref(), answers),
            )
        })
        .collect()
}

fn condition_holds(condition: &Condition, answers: &AnswersMap) -> bool {
    let answer = match answers.get(&condition.question_key) {
        None | Some(Value::Null) => return false,
        Some(answer) => answer,
    };

    match &condition.operator {
        Operator::Equals => same_value(answer, &condition.value),
        Operator::NotEquals => !same_value(answer, &condition.value),
        Operator::Contains => contains(answer, &condition.value),
        Operator::Other(_) => false,
    }
}

/// JSON equality, except numbers compare by value so `1` matches `1.0`.
fn same_value(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.as_f64() == right.as_f64(),
        _ => left == right,
    }
}

/// Array answers match by element; string answers match by substring.
fn contains(answer: &Value, needle: &Value) -> bool {
    match answer {
        Value::Array(items) => items.iter().any(|item| same_value(item, needle)),
        Value::String(text) => needle.as_str().is_some_and(|part| text.contains(part)),
        _ => false,
    }
}
