//! Command error type.

use auth_engine::AuthError;
use console_config_and_utils::CoreError;
use console_storage::StorageError;
use resilient_fetcher::{FetchError, RedirectReason};
use thiserror::Error;

use crate::intents::redirect_notice;

#[derive(Error, Debug)]
pub enum CliError {
    /// The command needs a session and there is none (any more)
    #[error("Login required ({0:?})")]
    LoginRequired(RedirectReason),

    /// Input ended before the login flow finished
    #[error("Login cancelled")]
    Cancelled,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Text printed to stderr when a command fails.
    pub fn user_message(&self) -> String {
        match self {
            CliError::LoginRequired(reason) => redirect_notice(*reason),
            CliError::Cancelled => "Login cancelled.".to_string(),
            CliError::Auth(e) => e.user_message(),
            CliError::Fetch(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
