//! Request plumbing shared by the remote API adapters.
//!
//! Every call is attempted exactly once. Failures come back as
//! [`Error::Upstream`] with whatever diagnostic payload the remote returned;
//! retry policy belongs to the caller.

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub(crate) fn build_client(timeout_secs: u64) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("build http client")
}

/// Send `request` and return the JSON body of a 2xx response.
pub(crate) async fn send_json(operation: &'static str, request: RequestBuilder) -> Result<Value> {
    let response = request.send().await.map_err(|err| {
        warn!(operation, error = %err, "remote request did not complete");
        Error::Upstream {
            operation,
            status: None,
            payload: json!({ "error": err.to_string() }),
        }
    })?;

    let status = response.status();
    let body = response.bytes().await.map_err(|err| Error::Upstream {
        operation,
        status: Some(status.as_u16()),
        payload: json!({ "error": format!("read body: {}", err) }),
    })?;
    let payload = parse_payload(&body);

    if !status.is_success() {
        warn!(operation, status = status.as_u16(), payload = %payload, "remote API returned an error");
        return Err(Error::Upstream {
            operation,
            status: Some(status.as_u16()),
            payload,
        });
    }

    debug!(operation, status = status.as_u16(), "remote request succeeded");
    Ok(payload)
}

/// Decode a successful payload, treating shape mismatches as upstream errors.
pub(crate) fn decode<T: DeserializeOwned>(operation: &'static str, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|err| {
        warn!(operation, error = %err, "unexpected remote response shape");
        Error::Upstream {
            operation,
            status: None,
            payload: json!({ "error": "unexpected response shape", "detail": err.to_string() }),
        }
    })
}

/// JSON when possible, otherwise the body as lossy text.
fn parse_payload(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
