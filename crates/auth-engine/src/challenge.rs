//! OTP challenge data and local input validation.

use std::sync::LazyLock;

use crate::{AuthError, AuthResult};
use console_config_and_utils::Config;
use regex::Regex;

/// Tunables for the OTP flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpConfig {
    /// Seconds a fresh code blocks another send.
    pub cooldown_secs: u32,
    /// Exact number of digits in a code.
    pub code_length: usize,
    /// Verification attempts allowed per issued code.
    pub max_verify_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 60,
            code_length: 6,
            max_verify_attempts: 5,
        }
    }
}

impl From<&Config> for OtpConfig {
    fn from(config: &Config) -> Self {
        Self {
            cooldown_secs: config.otp_cooldown_secs,
            code_length: config.otp_code_length,
            max_verify_attempts: config.otp_max_verify_attempts,
        }
    }
}

/// The in-progress login attempt for one identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpChallenge {
    /// Identifier (email) the code was sent to.
    pub subject_key: Option<String>,
    /// Server correlation id (`userId`) returned by the send step.
    pub challenge_id: Option<String>,
    /// Seconds until another code may be requested.
    pub cooldown_remaining: u32,
    /// Codes submitted against the current challenge.
    pub verify_attempts: u32,
}

impl OtpChallenge {
    /// Record a successful send. A different identifier starts over; the same
    /// identifier keeps its key but takes the fresh correlation id.
    pub(crate) fn issue(&mut self, subject_key: &str, challenge_id: String, cooldown_secs: u32) {
        if self.subject_key.as_deref() != Some(subject_key) {
            self.discard();
            self.subject_key = Some(subject_key.to_string());
        }
        self.challenge_id = Some(challenge_id);
        self.verify_attempts = 0;
        self.cooldown_remaining = cooldown_secs;
    }

    /// Drop identifier and correlation data. The cooldown is left alone.
    pub(crate) fn discard(&mut self) {
        self.subject_key = None;
        self.challenge_id = None;
        self.verify_attempts = 0;
    }

    /// Advance the cooldown clock by one second.
    pub(crate) fn tick(&mut self) -> u32 {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);
        self.cooldown_remaining
    }
}

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Check the `local@domain.tld` shape.
pub fn validate_email(identifier: &str) -> AuthResult<()> {
    if EMAIL_PATTERN.is_match(identifier) {
        Ok(())
    } else {
        Err(AuthError::Validation(
            "Please enter a valid email address.".to_string(),
        ))
    }
}

/// Check that `code` is exactly `length` ASCII digits.
pub fn validate_code(code: &str, length: usize) -> AuthResult<()> {
    if code.len() == length && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AuthError::Validation(format!(
            "Please enter the {}-digit code from your email.",
            length
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        for email in ["user@x.com", "a.b+tag@mall.co.in", "x@y.z"] {
            assert!(validate_email(email).is_ok(), "{email} should be valid");
        }
    }

    #[test]
    fn test_invalid_emails() {
        for email in [
            "",
            "user",
            "user@",
            "@x.com",
            "user@x",
            "user@.com",
            "user@x.",
            "us er@x.com",
            "user@@x.com",
            "a@b@c.com",
            "user@x.com ",
        ] {
            assert!(
                matches!(validate_email(email), Err(AuthError::Validation(_))),
                "{email:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_code_length_and_digits() {
        assert!(validate_code("123456", 6).is_ok());
        assert!(validate_code("000000", 6).is_ok());

        for code in ["", "12345", "1234567", "12a456", " 12345", "１２３４５６"] {
            assert!(
                matches!(validate_code(code, 6), Err(AuthError::Validation(_))),
                "{code:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_issue_for_new_subject_resets_challenge() {
        let mut challenge = OtpChallenge::default();
        challenge.issue("a@x.com", "u-1".to_string(), 60);
        challenge.verify_attempts = 3;

        challenge.issue("b@x.com", "u-2".to_string(), 60);

        assert_eq!(challenge.subject_key.as_deref(), Some("b@x.com"));
        assert_eq!(challenge.challenge_id.as_deref(), Some("u-2"));
        assert_eq!(challenge.verify_attempts, 0);
        assert_eq!(challenge.cooldown_remaining, 60);
    }

    #[test]
    fn test_discard_keeps_cooldown() {
        let mut challenge = OtpChallenge::default();
        challenge.issue("a@x.com", "u-1".to_string(), 60);

        challenge.discard();

        assert!(challenge.subject_key.is_none());
        assert!(challenge.challenge_id.is_none());
        assert_eq!(challenge.cooldown_remaining, 60);
    }

    #[test]
    fn test_tick_saturates() {
        let mut challenge = OtpChallenge {
            cooldown_remaining: 1,
            ..Default::default()
        };
        assert_eq!(challenge.tick(), 0);
        assert_eq!(challenge.tick(), 0);
    }

    #[test]
    fn test_config_conversion() {
        let config = Config {
            otp_cooldown_secs: 30,
            ..Config::default()
        };
        let otp = OtpConfig::from(&config);
        assert_eq!(otp.cooldown_secs, 30);
        assert_eq!(otp.code_length, 6);
        assert_eq!(otp.max_verify_attempts, 5);
    }
}
