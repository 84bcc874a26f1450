//! Form definitions: questions, their typed shape and conditional rules.
//!
//! The JSON layout is camelCase and keeps the remote field naming
//! (`airtableFieldId`) so stored documents stay readable next to the remote
//! table they map onto.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A persisted form. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    pub owner_user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub airtable_base_id: String,
    pub airtable_table_id: String,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner-supplied form definition, before an id and timestamps are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub airtable_base_id: String,
    pub airtable_table_id: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "questionKey")]
    pub key: String,
    /// Remote column the answer is written to.
    #[serde(rename = "airtableFieldId")]
    pub remote_field_id: String,
    #[serde(
        rename = "airtableFieldName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub remote_field_name: Option<String>,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_rules: Option<ConditionalRules>,
}

/// Question type, tagged by the JSON `type` field.
///
/// Only the select variants carry options, and [`SelectOptions`] cannot be
/// empty. Unrecognised type names land in `Unsupported` so stored forms still
/// load; the validator rejects answers for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QuestionKind {
    ShortText,
    LongText,
    SingleSelect { options: SelectOptions },
    MultiSelect { options: SelectOptions },
    Attachment,
    #[serde(other)]
    Unsupported,
}

impl QuestionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            QuestionKind::ShortText => "shortText",
            QuestionKind::LongText => "longText",
            QuestionKind::SingleSelect { .. } => "singleSelect",
            QuestionKind::MultiSelect { .. } => "multiSelect",
            QuestionKind::Attachment => "attachment",
            QuestionKind::Unsupported => "unsupported",
        }
    }

    pub fn options(&self) -> Option<&SelectOptions> {
        match self {
            QuestionKind::SingleSelect { options } | QuestionKind::MultiSelect { options } => {
                Some(options)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("select questions need at least one option")]
pub struct EmptyOptions;

/// Non-empty, ordered option names for select questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SelectOptions(Vec<String>);

impl SelectOptions {
    pub fn new(options: Vec<String>) -> Result<Self, EmptyOptions> {
        if options.is_empty() {
            return Err(EmptyOptions);
        }
        Ok(Self(options))
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, candidate: &str) -> bool {
        self.0.iter().any(|option| option == candidate)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for SelectOptions {
    type Error = EmptyOptions;

    fn try_from(options: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(options)
    }
}

impl From<SelectOptions> for Vec<String> {
    fn from(options: SelectOptions) -> Self {
        options.0
    }
}

impl fmt::Display for SelectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalRules {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub question_key: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

/// How condition results combine. Anything other than `AND`/`OR` is kept
/// verbatim in `Other` (an empty string when the field was missing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Logic {
    And,
    Or,
    Other(String),
}

impl Default for Logic {
    fn default() -> Self {
        Logic::Other(String::new())
    }
}

impl From<String> for Logic {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "AND" => Logic::And,
            "OR" => Logic::Or,
            _ => Logic::Other(raw),
        }
    }
}

impl From<Logic> for String {
    fn from(logic: Logic) -> Self {
        match logic {
            Logic::And => "AND".to_string(),
            Logic::Or => "OR".to_string(),
            Logic::Other(raw) => raw,
        }
    }
}

/// Comparison applied to a referenced answer. Unknown names are kept in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    Other(String),
}

impl From<String> for Operator {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "equals" => Operator::Equals,
            "notEquals" => Operator::NotEquals,
            "contains" => Operator::Contains,
            _ => Operator::Other(raw),
        }
    }
}

impl From<Operator> for String {
    fn from(operator: Operator) -> Self {
        match operator {
            Operator::Equals => "equals".to_string(),
            Operator::NotEquals => "notEquals".to_string(),
            Operator::Contains => "contains".to_string(),
            Operator::Other(raw) => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_question_parses_with_options() {
        let question: Question = serde_json::from_value(json!({
            "questionKey": "color",
            "airtableFieldId": "fldColor",
            "label": "Color",
            "type": "singleSelect",
            "required": true,
            "options": ["red", "blue"]
        }))
        .expect("parse");
        assert_eq!(question.key, "color");
        assert!(question.required);
        let options = question.kind.options().expect("options");
        assert!(options.contains("red"));
        assert!(!options.contains("Red"));
    }

    #[test]
    fn select_question_without_options_is_rejected() {
        let result: Result<Question, _> = serde_json::from_value(json!({
            "questionKey": "color",
            "airtableFieldId": "fldColor",
            "label": "Color",
            "type": "multiSelect",
            "options": []
        }));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_type_loads_as_unsupported() {
        let question: Question = serde_json::from_value(json!({
            "questionKey": "when",
            "airtableFieldId": "fldWhen",
            "label": "When",
            "type": "date"
        }))
        .expect("parse");
        assert_eq!(question.kind, QuestionKind::Unsupported);
        assert!(!question.required);
    }

    #[test]
    fn rules_keep_unknown_logic_and_operator() {
        let rules: ConditionalRules = serde_json::from_value(json!({
            "logic": "XOR",
            "conditions": [{"questionKey": "a", "operator": "greaterThan", "value": 3}]
        }))
        .expect("parse");
        assert_eq!(rules.logic, Logic::Other("XOR".to_string()));
        assert_eq!(
            rules.conditions[0].operator,
            Operator::Other("greaterThan".to_string())
        );
    }

    #[test]
    fn missing_logic_defaults_to_other() {
        let rules: ConditionalRules =
            serde_json::from_value(json!({"conditions": []})).expect("parse");
        assert_eq!(rules.logic, Logic::Other(String::new()));
    }

    #[test]
    fn question_serializes_type_tag_beside_fields() {
        let question = Question {
            key: "tags".to_string(),
            remote_field_id: "fldTags".to_string(),
            remote_field_name: None,
            label: "Tags".to_string(),
            required: false,
            kind: QuestionKind::MultiSelect {
                options: SelectOptions::new(vec!["a".to_string()]).expect("options"),
            },
            conditional_rules: None,
        };
        let json = serde_json::to_value(&question).expect("serialize");
        assert_eq!(
            json,
            json!({
                "questionKey": "tags",
                "airtableFieldId": "fldTags",
                "label": "Tags",
                "required": false,
                "type": "multiSelect",
                "options": ["a"]
            })
        );
    }
}
