use crate::advice::error::MalformedReplyError;
use crate::domain::recommendation::{NormalizedRecommendation, REQUIRED_FIELDS};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::LazyLock;

// Opening fence, optional language tag, content, closing fence.
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```([A-Za-z0-9_+-]*)\s*([\s\S]*?)\s*```").expect("fence pattern is valid")
});

/// Body of a successful call to the recommendation service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceReply {
    pub recommendations: String,
}

/// Returns the trimmed content of the first ```` ```json ```` block in `text`,
/// or of the first fenced block of any kind when none is tagged json.
pub fn extract_fenced_block(text: &str) -> Option<&str> {
    let mut first = None;
    for caps in FENCED_BLOCK.captures_iter(text) {
        let (Some(tag), Some(body)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if tag.as_str().eq_ignore_ascii_case("json") {
            return Some(body.as_str().trim());
        }
        first.get_or_insert(body.as_str().trim());
    }
    first
}

/// Decodes the service's JSON body and normalizes its `recommendations` text.
pub fn normalize_service_body(body: &str) -> Result<NormalizedRecommendation, MalformedReplyError> {
    let reply = serde_json::from_str::<ServiceReply>(body).map_err(|e| {
        MalformedReplyError::new(format!("service body has no recommendations text: {e}"))
    })?;
    normalize_reply(&reply.recommendations)
}

pub fn normalize_reply(text: &str) -> Result<NormalizedRecommendation, MalformedReplyError> {
    tracing::debug!(raw_len = text.len(), raw = %text, "normalizing recommendation reply");

    let block = extract_fenced_block(text)
        .ok_or_else(|| MalformedReplyError::new("fenced JSON block not found"))?;
    let value = serde_json::from_str::<Value>(block)
        .map_err(|e| MalformedReplyError::new(format!("fenced block is not valid JSON: {e}")))?;
    normalize_value(value)
}

/// Back-fills each required field that is absent, null or empty with `[{}]`.
pub fn normalize_value(value: Value) -> Result<NormalizedRecommendation, MalformedReplyError> {
    let Value::Object(mut obj) = value else {
        return Err(MalformedReplyError::new("top-level value is not an object"));
    };

    for field in REQUIRED_FIELDS {
        let needs_placeholder = match obj.get(field) {
            None | Some(Value::Null) => true,
            Some(Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        };
        if needs_placeholder {
            tracing::debug!(field, "required field missing; inserting placeholder record");
            obj.insert(field.to_string(), json!([{}]));
        }
    }

    serde_json::from_value::<NormalizedRecommendation>(Value::Object(obj))
        .map_err(|e| MalformedReplyError::new(format!("required field has unexpected shape: {e}")))
}
