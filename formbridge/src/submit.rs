//! Submission orchestration: validate, write upstream, keep a receipt.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::core::form::Form;
use crate::core::submission::process_submission;
use crate::core::types::AnswersMap;
use crate::error::{Error, Result};
use crate::forms::load_form;
use crate::io::airtable::RemoteTables;
use crate::io::oauth::AccessToken;
use crate::io::store::{JsonStore, ResponseRecord};

/// Number of answers shown per response in listings.
const PREVIEW_ANSWERS: usize = 3;

/// Identifiers of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub response_id: String,
    pub airtable_record_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPreview {
    pub question_key: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSummary {
    pub id: String,
    pub airtable_record_id: String,
    pub deleted_in_airtable: bool,
    pub created_at: DateTime<Utc>,
    pub preview: Vec<AnswerPreview>,
}

/// Validate `answers` against the stored form and write one remote row.
///
/// Nothing is sent upstream unless every question passes. The remote write
/// happens once; a local receipt is stored only after it succeeds. Identical
/// concurrent submissions are not de-duplicated.
#[instrument(skip_all, fields(form_id = %form_id, answers = answers.len()))]
pub async fn submit_response(
    store: &JsonStore,
    remote: &dyn RemoteTables,
    token: &AccessToken,
    form_id: &str,
    answers: &AnswersMap,
) -> Result<Receipt> {
    let form = load_form(store, form_id)?;
    let record = process_submission(&form, answers).map_err(|errors| {
        info!(errors = errors.len(), "submission rejected");
        Error::Validation(errors)
    })?;

    let airtable_record_id = remote
        .create_record(token, &form.airtable_base_id, &form.airtable_table_id, &record)
        .await?;

    let stored = store
        .insert_response(&form.id, &airtable_record_id, answers)
        .inspect_err(|err| {
            warn!(
                airtable_record_id = %airtable_record_id,
                error = %err,
                "remote row written but receipt not stored"
            );
        })?;

    info!(response_id = %stored.id, airtable_record_id = %airtable_record_id, "submission accepted");
    Ok(Receipt {
        response_id: stored.id,
        airtable_record_id,
    })
}

/// Stored receipts for a form, newest first, each with a short answer preview.
pub fn list_responses(store: &JsonStore, form_id: &str) -> Result<Vec<ResponseSummary>> {
    let form = load_form(store, form_id)?;
    let records = store.list_responses(&form.id)?;
    Ok(records
        .into_iter()
        .map(|record| summarize(&form, record))
        .collect())
}

/// Preview answers follow question order; answers to keys the form no longer
/// has come last.
fn summarize(form: &Form, record: ResponseRecord) -> ResponseSummary {
    let known = form
        .questions
        .iter()
        .filter_map(|question| record.answers.get_key_value(&question.key));
    let unknown = record
        .answers
        .iter()
        .filter(|(key, _)| !form.questions.iter().any(|question| &question.key == *key));
    let preview = known
        .chain(unknown)
        .take(PREVIEW_ANSWERS)
        .map(|(key, value)| AnswerPreview {
            question_key: key.clone(),
            value: value.clone(),
        })
        .collect();

    ResponseSummary {
        id: record.id,
        airtable_record_id: record.airtable_record_id,
        deleted_in_airtable: record.deleted_in_airtable,
        created_at: record.created_at,
        preview,
    }
}
