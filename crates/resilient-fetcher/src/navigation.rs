//! Navigation intents emitted for the front end to act on.

use serde::{Deserialize, Serialize};

/// Why the user is being sent back to login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// No credential was stored when a request was made.
    NotLoggedIn,
    /// The backend reported the credential as expired.
    SessionExpired,
    /// The backend refused the caller's roles.
    AuthorizationDenied,
}

/// Where the front end should go next. The fetcher never navigates itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavigationIntent {
    RedirectToLogin { reason: RedirectReason },
}

impl NavigationIntent {
    pub fn redirect_to_login(reason: RedirectReason) -> Self {
        NavigationIntent::RedirectToLogin { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_serialization() {
        let intent = NavigationIntent::redirect_to_login(RedirectReason::SessionExpired);
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "redirect_to_login", "reason": "session_expired" })
        );
    }
}
