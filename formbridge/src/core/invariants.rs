//! Semantic invariants of form definitions not expressible via JSON Schema.

use std::collections::HashSet;

use crate::core::form::{FormDraft, QuestionKind};

/// Check form-level invariants:
/// - `name`, `airtableBaseId`, `airtableTableId` are non-blank
/// - At least one question
/// - Every question has a non-blank key, field id and label
/// - Question keys are unique
/// - No unsupported question types
/// - Conditions reference an existing question other than their own
pub fn validate_form_invariants(draft: &FormDraft) -> Vec<String> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("name", &draft.name),
        ("airtableBaseId", &draft.airtable_base_id),
        ("airtableTableId", &draft.airtable_table_id),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{} is required", field));
        }
    }

    if draft.questions.is_empty() {
        errors.push("at least one question is required".to_string());
        return errors;
    }

    let keys: HashSet<&str> = draft
        .questions
        .iter()
        .map(|question| question.key.as_str())
        .collect();
    let mut seen = HashSet::new();

    for (index, question) in draft.questions.iter().enumerate() {
        let path = format!("questions[{}]", index);

        if question.key.trim().is_empty() {
            errors.push(format!("{}: questionKey is required", path));
        } else if !seen.insert(question.key.as_str()) {
            errors.push(format!("{}: duplicate questionKey '{}'", path, question.key));
        }
        if question.remote_field_id.trim().is_empty() {
            errors.push(format!("{}: airtableFieldId is required", path));
        }
        if question.label.trim().is_empty() {
            errors.push(format!("{}: label is required", path));
        }
        if question.kind == QuestionKind::Unsupported {
            errors.push(format!("{}: unsupported question type", path));
        }

        let Some(rules) = &question.conditional_rules else {
            continue;
        };
        for condition in &rules.conditions {
            if condition.question_key == question.key {
                errors.push(format!(
                    "{}: condition references its own question '{}'",
                    path, question.key
                ));
            } else if !keys.contains(condition.question_key.as_str()) {
                errors.push(format!(
                    "{}: condition references unknown question '{}'",
                    path, condition.question_key
                ));
            }
        }
    }

    errors
}
