//! Mapping of library errors onto HTTP responses.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use formbridge::error::{AuthorizationError, Error};
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::state::AppState;

#[derive(Debug)]
pub enum ApiError {
    Domain(Error),
    /// Malformed request body or parameters.
    BadRequest(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Domain(err)
    }
}

impl From<AuthorizationError> for ApiError {
    fn from(err: AuthorizationError) -> Self {
        ApiError::Domain(Error::Authorization(err))
    }
}

/// Remote error payload attached to a 502 response. Only
/// [`reveal_upstream_errors`] decides whether it reaches the client.
#[derive(Debug, Clone)]
pub struct UpstreamDetail {
    pub message: String,
    pub status: Option<u16>,
    pub payload: Value,
}

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(json!({ "message": text.into() }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::BadRequest(text) => return message(StatusCode::BAD_REQUEST, text),
            ApiError::Domain(err) => err,
        };
        match err {
            Error::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Validation failed", "errors": errors })),
            )
                .into_response(),
            Error::InvalidForm(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Invalid form definition", "errors": errors })),
            )
                .into_response(),
            Error::Authorization(AuthorizationError::NotLoggedIn) => {
                message(StatusCode::UNAUTHORIZED, AuthorizationError::NotLoggedIn.to_string())
            }
            Error::Authorization(err) => {
                warn!(error = %err, "authorization rejected");
                message(StatusCode::BAD_REQUEST, err.to_string())
            }
            Error::NotFound(what) => message(StatusCode::NOT_FOUND, format!("{} not found", what)),
            Error::Upstream {
                operation,
                status,
                payload,
            } => {
                warn!(operation, status = ?status, payload = %payload, "upstream request failed");
                let text = format!("{} failed upstream", operation);
                let mut response = message(StatusCode::BAD_GATEWAY, text.clone());
                response.extensions_mut().insert(UpstreamDetail {
                    message: text,
                    status,
                    payload,
                });
                response
            }
            Error::Internal(err) => {
                error!(error = %format!("{:#}", err), "request failed");
                message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

/// Response middleware: re-render 502 bodies with the remote payload when
/// `server.expose_upstream_errors` is on.
pub async fn reveal_upstream_errors(State(state): State<AppState>, mut response: Response) -> Response {
    let Some(detail) = response.extensions_mut().remove::<UpstreamDetail>() else {
        return response;
    };
    if !state.config.server.expose_upstream_errors {
        return response;
    }
    (
        response.status(),
        Json(json!({
            "message": detail.message,
            "upstreamStatus": detail.status,
            "upstreamError": detail.payload,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use formbridge::error::ValidationError;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (
                ApiError::from(Error::Validation(vec![ValidationError::new("q", "bad")])),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(AuthorizationError::NotLoggedIn),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::from(AuthorizationError::StateMismatch),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(Error::NotFound("form x".to_string())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(Error::Upstream {
                    operation: "create record",
                    status: Some(422),
                    payload: json!({"error": "INVALID"}),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::from(Error::Internal(anyhow::anyhow!("disk full"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::BadRequest("answers object is required".to_string()),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn upstream_detail_rides_on_the_response() {
        let response = ApiError::from(Error::Upstream {
            operation: "whoami",
            status: Some(401),
            payload: json!({"error": "AUTHENTICATION_REQUIRED"}),
        })
        .into_response();
        let detail = response
            .extensions()
            .get::<UpstreamDetail>()
            .expect("detail");
        assert_eq!(detail.status, Some(401));
        assert_eq!(detail.payload["error"], "AUTHENTICATION_REQUIRED");
    }
}
