use serde_json::Value;
use std::fmt;

/// The reply did not contain a usable recommendation document.
///
/// Callers only see one kind of failure; `detail` is kept for logs.
#[derive(Debug, Clone)]
pub struct MalformedReplyError {
    pub detail: String,
}

impl MalformedReplyError {
    pub(crate) fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for MalformedReplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid JSON response from AI ({})", self.detail)
    }
}

impl std::error::Error for MalformedReplyError {}

#[derive(Debug, Clone)]
pub struct TransportError {
    pub stage: &'static str,
    pub detail: String,
    pub raw_body: Option<String>,
    pub raw_body_json: Option<Value>,
}

const BODY_EXCERPT_CHARS: usize = 512;

impl TransportError {
    /// The `detail` message of a JSON error body, as FastAPI-style services send.
    pub fn service_detail(&self) -> Option<String> {
        match self.raw_body_json.as_ref()?.get("detail")? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Leading part of the raw response body, for logs.
    pub fn body_excerpt(&self) -> Option<&str> {
        let body = self.raw_body.as_deref()?;
        let end = body
            .char_indices()
            .nth(BODY_EXCERPT_CHARS)
            .map_or(body.len(), |(i, _)| i);
        Some(&body[..end])
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recommendation service error (stage={}): {}",
            self.stage, self.detail
        )
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn http_error(body: &str) -> TransportError {
        TransportError {
            stage: "http",
            detail: "status=500 Internal Server Error".to_string(),
            raw_body: Some(body.to_string()),
            raw_body_json: serde_json::from_str(body).ok(),
        }
    }

    #[test]
    fn service_detail_reads_json_error_body() {
        let err = http_error(&json!({"detail": "Failed to fetch mutual funds"}).to_string());
        assert_eq!(err.service_detail().as_deref(), Some("Failed to fetch mutual funds"));
        assert_eq!(http_error("Bad Gateway").service_detail(), None);
    }

    #[test]
    fn body_excerpt_is_bounded() {
        let long = "é".repeat(BODY_EXCERPT_CHARS + 10);
        let err = http_error(&long);
        assert_eq!(err.body_excerpt().unwrap().chars().count(), BODY_EXCERPT_CHARS);
        assert_eq!(http_error("short").body_excerpt(), Some("short"));
    }
}
