//! In-crate fake of the identity service.

use crate::identity_client::{
    CodeIssued, IdentityApi, IssuedCredentials, RefreshedTokens, VerifyOutcome, VerifyRequest,
};
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

pub(crate) const VALID_CODE: &str = "123456";

pub(crate) fn jwt_expiring_at(exp: DateTime<Utc>) -> String {
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
        URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp.timestamp()))
    )
}

type RefreshResponse = Result<(String, Option<String>), String>;

/// Accepts [`VALID_CODE`] and records every call it receives.
pub(crate) struct FakeIdentity {
    send_calls: Mutex<Vec<String>>,
    verify_calls: Mutex<Vec<VerifyRequest>>,
    refresh_calls: Mutex<Vec<String>>,
    send_failure: Mutex<Option<u16>>,
    refresh_response: Mutex<RefreshResponse>,
    refresh_outage: Mutex<Option<u16>>,
    send_gate: Mutex<Option<Arc<Notify>>>,
    verify_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeIdentity {
    pub(crate) fn new() -> Self {
        Self {
            send_calls: Mutex::new(Vec::new()),
            verify_calls: Mutex::new(Vec::new()),
            refresh_calls: Mutex::new(Vec::new()),
            send_failure: Mutex::new(None),
            refresh_response: Mutex::new(Ok(("refreshed-token".to_string(), None))),
            refresh_outage: Mutex::new(None),
            send_gate: Mutex::new(None),
            verify_gate: Mutex::new(None),
        }
    }

    pub(crate) fn fail_sends_with(&self, status: u16) {
        *self.send_failure.lock() = Some(status);
    }

    pub(crate) fn set_refresh_response(&self, response: Result<(&str, Option<&str>), &str>) {
        *self.refresh_response.lock() = response
            .map(|(token, refresh)| (token.to_string(), refresh.map(str::to_string)))
            .map_err(str::to_string);
    }

    /// Make refresh calls fail as if the server answered `status`.
    pub(crate) fn fail_refreshes_with(&self, status: u16) {
        *self.refresh_outage.lock() = Some(status);
    }

    /// Make send calls wait until the returned handle is notified.
    pub(crate) fn hold_sends(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.send_gate.lock() = Some(gate.clone());
        gate
    }

    /// Make verify calls wait until the returned handle is notified.
    pub(crate) fn hold_verifications(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.verify_gate.lock() = Some(gate.clone());
        gate
    }

    pub(crate) fn send_calls(&self) -> Vec<String> {
        self.send_calls.lock().clone()
    }

    pub(crate) fn verify_calls(&self) -> Vec<VerifyRequest> {
        self.verify_calls.lock().clone()
    }

    pub(crate) fn refresh_calls(&self) -> Vec<String> {
        self.refresh_calls.lock().clone()
    }
}

#[async_trait]
impl IdentityApi for FakeIdentity {
    async fn request_code(&self, key: &str) -> AuthResult<CodeIssued> {
        self.send_calls.lock().push(key.to_string());

        let gate = self.send_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(status) = *self.send_failure.lock() {
            return Err(AuthError::Rejected {
                status,
                message: "send failed".to_string(),
            });
        }
        Ok(CodeIssued {
            user_id: format!("user-{}", self.send_calls.lock().len()),
        })
    }

    async fn verify_code(&self, request: &VerifyRequest) -> AuthResult<VerifyOutcome> {
        self.verify_calls.lock().push(request.clone());

        let gate = self.verify_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if request.otp == VALID_CODE {
            Ok(VerifyOutcome::Accepted(IssuedCredentials {
                access_token: format!("token-for-{}", request.user_id),
                refresh_token: Some("refresh-1".to_string()),
                account_id: Some("account-1".to_string()),
                user_id: None,
                expires_in: Some(3600),
            }))
        } else {
            Ok(VerifyOutcome::Rejected {
                message: "OTP mismatch".to_string(),
            })
        }
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshedTokens> {
        self.refresh_calls.lock().push(refresh_token.to_string());
        if let Some(status) = *self.refresh_outage.lock() {
            return Err(AuthError::Rejected {
                status,
                message: "service unavailable".to_string(),
            });
        }
        match self.refresh_response.lock().clone() {
            Ok((token, refresh_token)) => Ok(RefreshedTokens {
                token,
                refresh_token,
            }),
            Err(reason) => Err(AuthError::RefreshFailed(reason)),
        }
    }
}
