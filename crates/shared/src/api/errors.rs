//! Flattening backend error bodies into one human-readable message

use serde_json::Value;

use crate::IdmsError;

pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

/// Flatten whatever error shape the backend returned into one string.
///
/// - a bare string is returned as-is
/// - `{"error": "..."}` or `{"detail": "..."}` returns that message
/// - any other object has its values (strings or arrays of strings) joined with `", "`
pub fn normalize_error_message(body: &Value) -> String {
    let message = match body {
        Value::String(text) => text.trim().to_string(),
        Value::Object(map) => {
            if let Some(Value::String(error)) = map.get("error") {
                error.clone()
            } else if let Some(Value::String(detail)) = map.get("detail") {
                detail.clone()
            } else {
                let mut parts = Vec::new();
                for value in map.values() {
                    collect_messages(value, &mut parts);
                }
                parts.join(", ")
            }
        }
        Value::Array(items) => {
            let mut parts = Vec::new();
            for item in items {
                collect_messages(item, &mut parts);
            }
            parts.join(", ")
        }
        _ => String::new(),
    };

    if message.is_empty() {
        FALLBACK_MESSAGE.to_string()
    } else {
        message
    }
}

fn collect_messages(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) if !text.is_empty() => out.push(text.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_messages(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_messages(item, out)),
        Value::Number(n) => out.push(n.to_string()),
        _ => {}
    }
}

/// Map a non-2xx status and its body onto the error taxonomy
pub fn error_for_status(status: u16, body: &Value) -> IdmsError {
    let message = normalize_error_message(body);
    match status {
        401 => IdmsError::Unauthorized(message),
        403 => IdmsError::PermissionDenied(message),
        404 => IdmsError::NotFound(message),
        _ => IdmsError::Network(message),
    }
}
