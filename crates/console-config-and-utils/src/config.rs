//! Configuration management for the console.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default backend URL (can be overridden at compile time via MALL_CONSOLE_API_URL).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("MALL_CONSOLE_API_URL") {
    Some(url) => url,
    None => "https://api.mallconsole.dev",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_LOG_LEVEL: &str = "MALL_CONSOLE_LOG_LEVEL";
const ENV_API_URL: &str = "MALL_CONSOLE_API_URL";

/// Main console configuration.
///
/// Every field has a serde default so partial config files stay valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Backend base URL; endpoint paths are joined onto it.
    pub api_base_url: String,
    /// Per-request timeout for outbound HTTP calls.
    pub request_timeout_secs: u64,
    /// Retry budget for transient failures of authenticated requests.
    pub max_retries: u32,
    /// Base delay for exponential backoff (doubles on every retry).
    pub retry_base_delay_ms: u64,
    /// Window during which a new OTP cannot be requested.
    pub otp_cooldown_secs: u32,
    /// Number of digits in an OTP.
    pub otp_code_length: usize,
    /// Verification attempts allowed against one issued code.
    pub otp_max_verify_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 1_000,
            otp_cooldown_secs: 60,
            otp_code_length: 6,
            otp_max_verify_attempts: 5,
        }
    }
}

impl Config {
    /// Load configuration from the console config file, falling back to
    /// defaults, then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production). Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(url) = non_empty(ENV_API_URL) {
            self.api_base_url = url;
        }
    }

    /// Reject values the auth core cannot operate with.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;
        if self.otp_code_length == 0 {
            return Err(CoreError::Config(
                "otp_code_length must be at least 1".to_string(),
            ));
        }
        if self.otp_max_verify_attempts == 0 {
            return Err(CoreError::Config(
                "otp_max_verify_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Backend base URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}
