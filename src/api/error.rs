//! Error types for talking to the generation backend.
//!
//! [`ApiError`] separates backend rejections (an HTTP status plus the
//! backend's `detail` message) from transport failures and payloads that do
//! not match any known contract revision.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while calling the backend API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-success HTTP status.
    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    /// The backend answered 2xx but flagged the call with `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The response body did not match the expected shape.
    #[error("unexpected response payload: {0}")]
    Decode(String),

    /// Underlying network failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    /// Network failures, 5xx and 429 may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            ApiError::Rejected(_) | ApiError::Decode(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }

    /// Builds a status error from a raw response body.
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| detail_message(&v))
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    "unknown error".to_string()
                } else {
                    trimmed.to_string()
                }
            });
        ApiError::Status { status, message }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

// Error bodies carry `detail` as a string, or as a list of `{loc, msg}`
// validation entries; some endpoints use `message` or `error` instead.
fn detail_message(body: &Value) -> Option<String> {
    match body.get("detail") {
        Some(Value::String(s)) => return Some(s.clone()),
        Some(Value::Array(items)) => {
            let msgs: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let msg = item.get("msg")?.as_str()?;
                    let loc = item
                        .get("loc")
                        .and_then(Value::as_array)
                        .and_then(|parts| parts.last())
                        .map(|last| match last {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        });
                    Some(match loc {
                        Some(field) => format!("{field}: {msg}"),
                        None => msg.to_string(),
                    })
                })
                .collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
