//! Infallible string coercion for arbitrary [`Value`]s.

use std::fmt::Write as _;

use crate::value::Value;

/// Convert `value` to a string without failing. Nil becomes an empty string.
pub fn to_string_safe(value: &Value) -> String {
    to_string_safe_or(value, "")
}

/// Like [`to_string_safe`] but nil becomes `default`.
pub fn to_string_safe_or(value: &Value, default: &str) -> String {
    match value {
        Value::Nil | Value::Json(serde_json::Value::Null) => default.to_string(),
        Value::Text(text) => text.clone(),
        Value::Json(serde_json::Value::String(text)) => text.clone(),
        Value::Json(serde_json::Value::Array(items)) => join_elements(items),
        Value::Json(json) => json.to_string(),
        Value::Buffer(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Error(error) => write_display(error.as_ref()).unwrap_or_else(|| "error".to_string()),
        // A Display impl that reports an error falls back to a placeholder
        // instead of panicking the way `ToString` would.
        Value::Display(display) => {
            write_display(display.as_ref()).unwrap_or_else(|| "[unprintable]".to_string())
        }
        Value::Deferred(_) => "[deferred]".to_string(),
        Value::Stream(_) => "[stream]".to_string(),
    }
}

/// Safe string, lowercased and trimmed.
pub fn normalize_string(value: &Value) -> String {
    to_string_safe(value).to_lowercase().trim().to_string()
}

/// True when the safe string form of `value` is blank.
pub fn is_empty_string(value: &Value) -> bool {
    to_string_safe(value).trim().is_empty()
}

/// Elements coerced one by one and joined with `,`; null elements are empty.
fn join_elements(items: &[serde_json::Value]) -> String {
    let mut out = String::new();
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        match item {
            serde_json::Value::Null => {}
            serde_json::Value::String(text) => out.push_str(text),
            serde_json::Value::Array(nested) => out.push_str(&join_elements(nested)),
            other => out.push_str(&other.to_string()),
        }
    }
    out
}

fn write_display(value: &(impl std::fmt::Display + ?Sized)) -> Option<String> {
    let mut out = String::new();
    write!(out, "{value}").ok()?;
    Some(out)
}
