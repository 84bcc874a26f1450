//! Single-pass validation of a whole submission.

use crate::core::answer::validate_answer;
use crate::core::form::Form;
use crate::core::rules::is_visible;
use crate::core::types::{AnswersMap, NormalizedRecord};
use crate::error::ValidationError;

/// Validate every question of `form` against `answers`.
///
/// Questions are visited in stored order, which only affects the order of the
/// returned errors. Every failing question is reported; the partially built
/// record is dropped as soon as one error exists.
pub fn process_submission(
    form: &Form,
    answers: &AnswersMap,
) -> Result<NormalizedRecord, Vec<ValidationError>> {
    let mut record = NormalizedRecord::new();
    let mut errors = Vec::new();

    for question in &form.questions {
        let visible = is_visible(question.conditional_rules.as_ref(), answers);
        match validate_answer(question, visible, answers.get(&question.key)) {
            Ok(Some(value)) => {
                record.insert(question.remote_field_id.clone(), value);
            }
            Ok(None) => {}
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(record)
    } else {
        Err(errors)
    }
}
