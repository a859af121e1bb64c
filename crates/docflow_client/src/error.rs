use thiserror::Error;

/// Client-side failure taxonomy. A job that reaches the `failed` status
/// is a normal terminal observation, not one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The file transfer failed before a document record was created.
    #[error("upload failed: {0}")]
    Transfer(String),
    /// A status fetch inside a poll loop failed; the loop has stopped.
    #[error("status fetch failed: {0}")]
    PollFetch(String),
    /// The question-answering call failed.
    #[error("query failed: {0}")]
    Query(String),
    /// Some other endpoint call failed.
    #[error("request failed: {0}")]
    Request(String),
    /// The response did not match the documented shape.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The operation was cancelled by its owner.
    #[error("cancelled")]
    Cancelled,
    /// The client could not be constructed from its settings.
    #[error("invalid client settings: {0}")]
    Settings(String),
}

/// Extracts the user-facing message from an error response body.
///
/// The backend wraps failures as `{"detail": ...}`; anything else falls
/// back to a generic message built from the HTTP status.
pub(crate) fn server_message(status: reqwest::StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(detail) if !detail.is_null() => return detail.to_string(),
            _ => {}
        }
    }
    format!("server returned {status}")
}
