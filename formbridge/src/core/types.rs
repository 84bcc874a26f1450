//! Shared deterministic types for submission processing.
//!
//! These values live for a single request: the answers map a client posted and
//! the normalized record handed to the remote write. Both use ordered maps so
//! serialized output is stable across runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Submitted answers keyed by `questionKey`. Read-only for the engine.
pub type AnswersMap = BTreeMap<String, Value>;

/// Field values keyed by remote field id, in the shape the remote API expects.
pub type NormalizedRecord = BTreeMap<String, NormalizedValue>;

/// A validated answer ready for the remote write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NormalizedValue {
    /// Text and single-select answers, passed through unchanged.
    Scalar(Value),
    /// Multi-select option names.
    Choices(Vec<String>),
    /// Attachment envelopes.
    Attachments(Vec<AttachmentRef>),
}

/// Remote attachment envelope: the API fetches the file from `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub url: String,
}

/// True when a value counts as "not answered" for required checks.
///
/// Missing, `null`, blank strings and empty arrays are all empty.
pub fn is_empty_answer(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}
