//! In-process fakes for command tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use auth_engine::{
    AuthError, AuthResult, CodeIssued, IdentityApi, IssuedCredentials, RefreshedTokens, Session,
    VerifyOutcome, VerifyRequest,
};
use chrono::{DateTime, Utc};
use console_config_and_utils::Config;
use console_storage::MemoryStorage;
use parking_lot::Mutex;
use resilient_fetcher::{ApiRequest, ApiResponse, HttpTransport, TransportFailure};

use crate::app::Console;

pub const VALID_CODE: &str = "123456";

#[derive(Default)]
pub struct FakeIdentity {
    pub sends: Mutex<Vec<String>>,
    pub verifies: Mutex<Vec<String>>,
    pub refresh_fails: bool,
    pub refresh_unavailable: bool,
}

#[async_trait]
impl IdentityApi for FakeIdentity {
    async fn request_code(&self, key: &str) -> AuthResult<CodeIssued> {
        let mut sends = self.sends.lock();
        sends.push(key.to_string());
        Ok(CodeIssued {
            user_id: format!("user-{}", sends.len()),
        })
    }

    async fn verify_code(&self, request: &VerifyRequest) -> AuthResult<VerifyOutcome> {
        self.verifies.lock().push(request.otp.clone());
        if request.otp != VALID_CODE {
            return Ok(VerifyOutcome::Rejected {
                message: String::new(),
            });
        }
        Ok(VerifyOutcome::Accepted(IssuedCredentials {
            access_token: format!("token-for-{}", request.user_id),
            refresh_token: Some("refresh-1".to_string()),
            account_id: Some("account-1".to_string()),
            user_id: None,
            expires_in: Some(3600),
        }))
    }

    async fn refresh(&self, _refresh_token: &str) -> AuthResult<RefreshedTokens> {
        if self.refresh_unavailable {
            return Err(AuthError::Rejected {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        if self.refresh_fails {
            return Err(AuthError::RefreshFailed("refresh token revoked".to_string()));
        }
        Ok(RefreshedTokens {
            token: "refreshed-token".to_string(),
            refresh_token: None,
        })
    }
}

/// Replays scripted responses and records the paths requested.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<ApiResponse, TransportFailure>>>,
    pub requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<ApiResponse, TransportFailure>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest, _bearer: &str) -> Result<ApiResponse, TransportFailure> {
        self.requests.lock().push(request.clone());
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| {
            Err(TransportFailure::NoResponse {
                reason: "script exhausted".to_string(),
            })
        })
    }
}

pub fn ok(body: &str) -> Result<ApiResponse, TransportFailure> {
    Ok(ApiResponse {
        status: 200,
        body: body.to_string(),
    })
}

pub fn http(status: u16, body: &str) -> Result<ApiResponse, TransportFailure> {
    Err(TransportFailure::Http {
        status,
        body: body.to_string(),
    })
}

pub fn session(token: &str, expires_at: Option<DateTime<Utc>>) -> Session {
    Session {
        access_token: token.to_string(),
        refresh_token: Some("refresh-1".to_string()),
        account_id: "account-1".to_string(),
        user_id: "user-1".to_string(),
        issued_at: Utc::now(),
        expires_at,
    }
}

pub fn console_with(identity: Arc<FakeIdentity>, transport: Arc<ScriptedTransport>) -> Console {
    Console::from_parts(
        &Config::default(),
        identity,
        Box::new(MemoryStorage::new()),
        transport,
    )
}

pub fn output(buffer: &[u8]) -> String {
    String::from_utf8_lossy(buffer).into_owned()
}
