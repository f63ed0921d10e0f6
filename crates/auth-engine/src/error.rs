//! Authentication error types.

use thiserror::Error;

/// Message shown when a submitted OTP is rejected.
pub(crate) const INVALID_CODE_MESSAGE: &str = "Invalid OTP. Please try again.";

/// Message shown when the session can no longer be used.
pub(crate) const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Malformed identifier or code, caught before any network call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A new code was requested before the resend window elapsed
    #[error("Code requested too soon, {remaining}s remaining")]
    AlreadyCoolingDown { remaining: u32 },

    /// A verification request is still awaiting the server
    #[error("Verification already in progress")]
    VerificationInFlight,

    /// A code request is still awaiting the server
    #[error("Code request already in progress")]
    RequestInFlight,

    /// Verify was called without a code having been sent
    #[error("No active OTP challenge")]
    NoActiveChallenge,

    /// The issued code has been tried too many times
    #[error("Verification attempts exhausted ({max} allowed)")]
    AttemptsExhausted { max: u32 },

    /// The server rejected the submitted code
    #[error("Invalid OTP: {0}")]
    InvalidCode(String),

    /// The identity service answered with an error
    #[error("Identity service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Token refresh error
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Session not found
    #[error("Not logged in")]
    NotLoggedIn,

    /// Invalid state transition in the OTP FSM
    #[error("Invalid OTP state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] console_storage::StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            AuthError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Text suitable for showing to the person at the console.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(reason) => reason.clone(),
            AuthError::AlreadyCoolingDown { remaining } => {
                format!("Please wait {}s before requesting a new code.", remaining)
            }
            AuthError::VerificationInFlight => {
                "A verification is already in progress. Please wait.".to_string()
            }
            AuthError::RequestInFlight => "A code is already being sent. Please wait.".to_string(),
            AuthError::NoActiveChallenge => "Please request a code first.".to_string(),
            AuthError::AttemptsExhausted { .. } => {
                "Too many attempts. Please request a new code.".to_string()
            }
            AuthError::InvalidCode(_) => INVALID_CODE_MESSAGE.to_string(),
            AuthError::RefreshFailed(_) | AuthError::NotLoggedIn => {
                SESSION_EXPIRED_MESSAGE.to_string()
            }
            AuthError::Rejected { message, .. } if !message.is_empty() => message.clone(),
            _ if self.is_transient() => {
                "The service is temporarily unavailable. Please try again shortly.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_message_includes_remaining() {
        let err = AuthError::AlreadyCoolingDown { remaining: 42 };
        assert_eq!(
            err.user_message(),
            "Please wait 42s before requesting a new code."
        );
    }

    #[test]
    fn test_invalid_code_message() {
        let err = AuthError::InvalidCode("otp mismatch".to_string());
        assert_eq!(err.user_message(), "Invalid OTP. Please try again.");
    }

    #[test]
    fn test_refresh_failure_reads_as_expired_session() {
        let err = AuthError::RefreshFailed("revoked".to_string());
        assert_eq!(err.user_message(), SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn test_server_rejection_is_transient() {
        let err = AuthError::Rejected {
            status: 503,
            message: String::new(),
        };
        assert!(err.is_transient());
        assert_eq!(
            err.user_message(),
            "The service is temporarily unavailable. Please try again shortly."
        );
    }

    #[test]
    fn test_client_errors_are_not_transient() {
        assert!(!AuthError::Validation("bad".to_string()).is_transient());
        assert!(!AuthError::NotLoggedIn.is_transient());
        assert!(!AuthError::Rejected {
            status: 404,
            message: "unknown user".to_string()
        }
        .is_transient());
    }
}
