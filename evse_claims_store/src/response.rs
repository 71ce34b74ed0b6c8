//! Classify device responses into success or rejection.
//!
//! The device reports failures in-band: either the bare string `"error"` or
//! an object whose `msg` is `"error"`. Everything else is a payload.

use serde_json::Value;

use crate::error::StoreError;

const ERROR_MARKER: &str = "error";

pub fn classify(value: Value) -> Result<Value, StoreError> {
    let rejected = match &value {
        Value::Null => Some("empty response"),
        Value::String(s) if s == ERROR_MARKER => Some(ERROR_MARKER),
        Value::Object(_) if message(&value) == Some(ERROR_MARKER) => Some(ERROR_MARKER),
        _ => None,
    };

    match rejected {
        Some(reason) => Err(StoreError::Rejected(reason.to_string())),
        None => Ok(value),
    }
}

/// The `msg` field of an acknowledgement, if present.
pub fn message(value: &Value) -> Option<&str> {
    value.get("msg").and_then(Value::as_str)
}
