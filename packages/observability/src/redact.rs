//! Credential redaction for log fields.

use serde_json::Value;
use std::collections::HashMap;

/// Replacement written in place of a redacted value.
pub const REDACTED: &str = "[REDACTED]";

/// Field-name fragments that always carry credentials in this codebase.
const DENYLIST_KEYS: [&str; 8] = [
    "token",
    "authorization",
    "bearer",
    "otp",
    "password",
    "secret",
    "cookie",
    "refreshtoken",
];

/// Redact credential-bearing entries in place.
///
/// A field is redacted when its name contains a denylisted fragment, or when
/// its string value looks like a bearer header or a JWT.
pub fn redact_fields(fields: &mut HashMap<String, Value>) {
    for (key, value) in fields.iter_mut() {
        *value = redact_value(key, value);
    }
}

/// Redact free-form message text that embeds a bearer credential.
pub(crate) fn redact_message(message: &str) -> String {
    message
        .split(' ')
        .map(|word| if looks_like_jwt(word) { REDACTED } else { word })
        .collect::<Vec<_>>()
        .join(" ")
}

fn redact_value(key: &str, value: &Value) -> Value {
    if is_sensitive_key(key) {
        return Value::String(REDACTED.to_string());
    }

    match value {
        Value::String(s) if looks_sensitive(s) => Value::String(REDACTED.to_string()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_value(k, v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_value(key, v)).collect()),
        other => other.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase().replace('_', "");
    DENYLIST_KEYS.iter().any(|entry| lower.contains(entry))
}

fn looks_sensitive(raw: &str) -> bool {
    raw.to_ascii_lowercase().starts_with("bearer ") || looks_like_jwt(raw)
}

fn looks_like_jwt(raw: &str) -> bool {
    let segments: Vec<&str> = raw.split('.').collect();
    segments.len() == 3
        && raw.len() > 40
        && segments.iter().all(|s| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '=')
        })
}
