//! Wiring of the session core for one console invocation.

use std::sync::Arc;

use auth_engine::{IdentityApi, IdentityClient, OtpConfig, SessionStore};
use console_config_and_utils::{Config, Paths};
use console_storage::create_storage;
use resilient_fetcher::{HttpTransport, ReqwestTransport, ResilientFetcher, RetryPolicy};

use crate::error::CliResult;

/// Shared handles every command works against.
pub struct Console {
    pub identity: Arc<dyn IdentityApi>,
    pub session: Arc<SessionStore>,
    pub fetcher: ResilientFetcher,
    pub otp: OtpConfig,
}

impl Console {
    /// Build the console against the configured backend and the durable
    /// session file under `paths`.
    pub fn new(config: Config, paths: &Paths) -> CliResult<Self> {
        let api_url = config.api_base_url()?;
        let timeout = config.request_timeout();

        let identity: Arc<dyn IdentityApi> = Arc::new(IdentityClient::new(api_url.as_str(), timeout)?);
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(api_url.as_str(), timeout)?);
        let storage = create_storage(paths)?;

        Ok(Self::from_parts(&config, identity, storage, transport))
    }

    pub fn from_parts(
        config: &Config,
        identity: Arc<dyn IdentityApi>,
        storage: Box<dyn console_storage::SecureStorage>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let session = Arc::new(SessionStore::new(storage, identity.clone()));
        let fetcher = ResilientFetcher::new(transport, session.clone(), RetryPolicy::from(config));

        Self {
            identity,
            session,
            fetcher,
            otp: OtpConfig::from(config),
        }
    }
}
