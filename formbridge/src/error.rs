//! Error kinds surfaced by the library.
//!
//! Core logic returns these as values; nothing in `core` logs. The HTTP layer
//! maps each kind onto a status code and decides how much detail to expose.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// One failing question in a submission. User-correctable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ValidationError {
    pub question_key: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(question_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            question_key: question_key.into(),
            message: message.into(),
        }
    }
}

/// Fatal problems with delegated access. Messages never carry token values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("Unauthorized - Not Logged In")]
    NotLoggedIn,
    #[error("Missing OAuth state")]
    MissingState,
    #[error("Invalid state - possible CSRF detected")]
    StateMismatch,
    #[error("Missing authorization code")]
    MissingCode,
    #[error("Missing PKCE code verifier")]
    MissingVerifier,
    #[error("Authorization denied: {error} - {}", .description.as_deref().unwrap_or(""))]
    Provider {
        error: String,
        description: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed for {} question(s)", .0.len())]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// Non-success from the remote API. `status` is `None` when the request
    /// never produced a response (connect error, timeout).
    #[error("{operation} failed upstream (status {status:?})")]
    Upstream {
        operation: &'static str,
        status: Option<u16>,
        payload: Value,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid form definition: {}", .0.join("; "))]
    InvalidForm(Vec<String>),

    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
