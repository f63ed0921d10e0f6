//! Failure classification.
//!
//! This is the only place that inspects backend error payloads. The string
//! matches below mirror what the backend currently sends; if its error
//! format changes, this file is what changes.

use crate::TransportFailure;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Recovery category for a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Transient; worth another attempt after a backoff.
    Retryable,
    /// The credential is no longer accepted.
    AuthExpired,
    /// The backend refused the caller's role or permissions.
    AuthzDenied,
    /// Will not succeed on retry.
    Fatal,
}

const EXPIRED_MARKER: &str = "jwt expired";
const ROLES_MARKER: &str = "roles";

/// Map a failed attempt to its recovery category. Total and side-effect free.
pub fn classify(failure: &TransportFailure) -> FailureClass {
    match failure {
        TransportFailure::NoResponse { .. } => FailureClass::Retryable,
        TransportFailure::Http { status, body } => {
            let body = body.to_ascii_lowercase();
            match *status {
                401 => FailureClass::AuthExpired,
                _ if body.contains(EXPIRED_MARKER) => FailureClass::AuthExpired,
                500 if body.contains(ROLES_MARKER) => FailureClass::AuthzDenied,
                500..=599 => FailureClass::Retryable,
                400..=499 => FailureClass::Fatal,
                _ => FailureClass::Fatal,
            }
        }
    }
}

/// Message to surface for a failure, preferring the payload's own
/// `message` or `error` field.
pub fn failure_message(failure: &TransportFailure) -> String {
    match failure {
        TransportFailure::NoResponse { reason } => format!("No response from server: {}", reason),
        TransportFailure::Http { status, body } => serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| {
                ["message", "error"]
                    .iter()
                    .find_map(|key| value.get(*key)?.as_str().map(str::to_string))
            })
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| format!("Request failed with status {}", status)),
    }
}
