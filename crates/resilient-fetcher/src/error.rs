//! Fetch error types.

use thiserror::Error;

/// Terminal failure of an `execute` call.
#[derive(Error, Debug)]
pub enum FetchError {
    /// No session was available when the request was dispatched
    #[error("Not logged in")]
    NotLoggedIn,

    /// The session was rejected and has been torn down
    #[error("Session expired")]
    SessionExpired,

    /// Transient failures outlasted the retry budget
    #[error("Service unavailable after {attempts} attempts")]
    ServiceUnavailable { attempts: u32 },

    /// Non-recoverable request failure, surfaced as classified
    #[error("Request failed: {message}")]
    Fatal { status: Option<u16>, message: String },

    /// Session store error
    #[error("Session error: {0}")]
    Auth(#[from] auth_engine::AuthError),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl FetchError {
    /// Text suitable for showing to the person at the console.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::NotLoggedIn | FetchError::SessionExpired => {
                "Your session has expired. Please log in again.".to_string()
            }
            FetchError::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please try again shortly.".to_string()
            }
            FetchError::Fatal { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns true when the caller should send the user back to login.
    pub fn requires_login(&self) -> bool {
        matches!(self, FetchError::NotLoggedIn | FetchError::SessionExpired)
    }
}

/// Result type alias using FetchError.
pub type FetchResult<T> = Result<T, FetchError>;
