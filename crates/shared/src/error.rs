use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform failure body returned by the proxy for every error it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Best-effort human readable message from a failed response body.
///
/// Looks at the backend's own `detail` first, then the envelope `details`
/// (which usually carries the backend's raw body, so a nested `detail` is
/// unwrapped), then `error` and `message`. Returns `None` when the body is not
/// a JSON object or carries none of these.
pub fn detail_from_body(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    detail_from_value(&value)
}

fn detail_from_value(value: &Value) -> Option<String> {
    let object = value.as_object()?;

    if let Some(detail) = object.get("detail").and_then(text_of) {
        return Some(detail);
    }

    if let Some(details) = object.get("details").and_then(Value::as_str) {
        let nested = serde_json::from_str::<Value>(details)
            .ok()
            .and_then(|inner| detail_from_value(&inner));
        if let Some(nested) = nested {
            return Some(nested);
        }
        if !details.trim().is_empty() {
            return Some(details.to_string());
        }
    }

    object
        .get("error")
        .and_then(text_of)
        .or_else(|| object.get("message").and_then(text_of))
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Null | Value::String(_) => None,
        // FastAPI validation errors arrive as a list of objects.
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
