//! Per-question answer validation and normalization.

use serde_json::Value;

use crate::core::form::{Question, QuestionKind, SelectOptions};
use crate::core::types::{AttachmentRef, NormalizedValue, is_empty_answer};
use crate::error::ValidationError;

/// Validate one raw answer and normalize it for the remote write.
///
/// Checks run in this order:
/// 1. A visible required question with an empty answer fails; no type checks run.
/// 2. Hidden questions and missing/`null` answers are skipped (`Ok(None)`),
///    so they never produce a record entry.
/// 3. Type-specific acceptance.
pub fn validate_answer(
    question: &Question,
    visible: bool,
    raw: Option<&Value>,
) -> Result<Option<NormalizedValue>, ValidationError> {
    if visible && question.required && is_empty_answer(raw) {
        return Err(ValidationError::new(
            &question.key,
            format!("Missing required answer for \"{}\"", question.key),
        ));
    }

    let value = match raw {
        Some(value) if visible && !value.is_null() => value,
        _ => return Ok(None),
    };

    let normalized = match &question.kind {
        QuestionKind::ShortText | QuestionKind::LongText => NormalizedValue::Scalar(value.clone()),
        QuestionKind::SingleSelect { options } => single_select(question, options, value)?,
        QuestionKind::MultiSelect { options } => multi_select(question, options, value)?,
        QuestionKind::Attachment => attachment(question, value)?,
        QuestionKind::Unsupported => {
            return Err(ValidationError::new(
                &question.key,
                format!("Unsupported question type for \"{}\"", question.key),
            ));
        }
    };
    Ok(Some(normalized))
}

fn single_select(
    question: &Question,
    options: &SelectOptions,
    value: &Value,
) -> Result<NormalizedValue, ValidationError> {
    match value.as_str() {
        Some(choice) if options.contains(choice) => Ok(NormalizedValue::Scalar(value.clone())),
        _ => Err(ValidationError::new(
            &question.key,
            format!(
                "Invalid value for \"{}\", must be one of: {}",
                question.key, options
            ),
        )),
    }
}

fn multi_select(
    question: &Question,
    options: &SelectOptions,
    value: &Value,
) -> Result<NormalizedValue, ValidationError> {
    let Value::Array(items) = value else {
        return Err(ValidationError::new(
            &question.key,
            format!("\"{}\" must be an array for multiSelect", question.key),
        ));
    };

    let mut choices = Vec::with_capacity(items.len());
    let mut invalid = Vec::new();
    for item in items {
        match item.as_str() {
            Some(choice) if options.contains(choice) => choices.push(choice.to_string()),
            Some(choice) => invalid.push(choice.to_string()),
            None => invalid.push(item.to_string()),
        }
    }

    if !invalid.is_empty() {
        return Err(ValidationError::new(
            &question.key,
            format!(
                "Invalid values for \"{}\": {}",
                question.key,
                invalid.join(", ")
            ),
        ));
    }
    Ok(NormalizedValue::Choices(choices))
}

fn attachment(question: &Question, value: &Value) -> Result<NormalizedValue, ValidationError> {
    let Value::Array(items) = value else {
        return Err(ValidationError::new(
            &question.key,
            format!(
                "\"{}\" must be an array of URLs for attachment",
                question.key
            ),
        ));
    };

    let urls: Option<Vec<AttachmentRef>> = items
        .iter()
        .map(|item| match item.as_str() {
            Some(url) if !url.trim().is_empty() => Some(AttachmentRef {
                url: url.to_string(),
            }),
            _ => None,
        })
        .collect();

    urls.map(NormalizedValue::Attachments).ok_or_else(|| {
        ValidationError::new(
            &question.key,
            format!("Invalid attachment URLs for \"{}\"", question.key),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        attachment_question, multi_select_question, required, short_text, single_select_question,
    };
    use serde_json::json;

    #[test]
    fn hidden_required_question_is_skipped() {
        let question = required(short_text("q1"));
        assert_eq!(validate_answer(&question, false, None), Ok(None));
        assert_eq!(
            validate_answer(&question, false, Some(&json!("value"))),
            Ok(None)
        );
    }

    #[test]
    fn missing_optional_answer_is_skipped() {
        let question = short_text("q1");
        assert_eq!(validate_answer(&question, true, None), Ok(None));
        assert_eq!(validate_answer(&question, true, Some(&Value::Null)), Ok(None));
    }

    #[test]
    fn visible_required_empty_answers_fail() {
        let question = required(short_text("q1"));
        for raw in [None, Some(Value::Null), Some(json!("  ")), Some(json!([]))] {
            let err = validate_answer(&question, true, raw.as_ref()).expect_err("required");
            assert_eq!(err.question_key, "q1");
            assert_eq!(err.message, "Missing required answer for \"q1\"");
        }
    }

    #[test]
    fn required_check_runs_before_type_checks() {
        let question = required(multi_select_question("tags", &["a", "b"]));
        let err = validate_answer(&question, true, Some(&json!(""))).expect_err("required");
        assert_eq!(err.message, "Missing required answer for \"tags\"");
    }

    #[test]
    fn text_is_accepted_as_is() {
        let question = short_text("q1");
        assert_eq!(
            validate_answer(&question, true, Some(&json!("  padded  "))),
            Ok(Some(NormalizedValue::Scalar(json!("  padded  "))))
        );
        assert_eq!(
            validate_answer(&question, true, Some(&json!(7))),
            Ok(Some(NormalizedValue::Scalar(json!(7))))
        );
    }

    #[test]
    fn single_select_accepts_listed_option() {
        let question = single_select_question("color", &["red", "blue"]);
        assert_eq!(
            validate_answer(&question, true, Some(&json!("red"))),
            Ok(Some(NormalizedValue::Scalar(json!("red"))))
        );
    }

    #[test]
    fn single_select_rejects_unlisted_option_with_allowed_list() {
        let question = single_select_question("color", &["red", "blue"]);
        let err = validate_answer(&question, true, Some(&json!("green"))).expect_err("invalid");
        assert_eq!(
            err.message,
            "Invalid value for \"color\", must be one of: red, blue"
        );
        let err = validate_answer(&question, true, Some(&json!("Red"))).expect_err("case");
        assert_eq!(err.question_key, "color");
    }

    #[test]
    fn multi_select_lists_invalid_elements() {
        let question = multi_select_question("color", &["red", "blue"]);
        let err = validate_answer(&question, true, Some(&json!(["red", "green"])))
            .expect_err("invalid");
        assert_eq!(err.message, "Invalid values for \"color\": green");
    }

    #[test]
    fn multi_select_accepts_subset_unchanged() {
        let question = multi_select_question("color", &["red", "blue"]);
        assert_eq!(
            validate_answer(&question, true, Some(&json!(["red"]))),
            Ok(Some(NormalizedValue::Choices(vec!["red".to_string()])))
        );
    }

    #[test]
    fn multi_select_requires_array() {
        let question = multi_select_question("color", &["red"]);
        let err = validate_answer(&question, true, Some(&json!("red"))).expect_err("shape");
        assert_eq!(err.message, "\"color\" must be an array for multiSelect");
    }

    #[test]
    fn attachment_wraps_urls() {
        let question = attachment_question("files");
        assert_eq!(
            validate_answer(&question, true, Some(&json!(["http://x/a.png"]))),
            Ok(Some(NormalizedValue::Attachments(vec![AttachmentRef {
                url: "http://x/a.png".to_string()
            }])))
        );
    }

    #[test]
    fn attachment_rejects_blank_or_non_string_urls() {
        let question = attachment_question("files");
        for raw in [json!([""]), json!(["  "]), json!([3]), json!(["ok", null])] {
            let err = validate_answer(&question, true, Some(&raw)).expect_err("invalid");
            assert_eq!(err.message, "Invalid attachment URLs for \"files\"");
        }
        let err = validate_answer(&question, true, Some(&json!("http://x"))).expect_err("shape");
        assert_eq!(err.message, "\"files\" must be an array of URLs for attachment");
    }

    #[test]
    fn unsupported_type_is_rejected() {
        let mut question = short_text("when");
        question.kind = QuestionKind::Unsupported;
        let err = validate_answer(&question, true, Some(&json!("2024-01-01"))).expect_err("type");
        assert_eq!(err.message, "Unsupported question type for \"when\"");
    }
}
