//! Identity service client: send code, verify code, refresh tokens.
//!
//! [`IdentityApi`] is the seam the login flow and session store depend on;
//! [`IdentityClient`] is the reqwest implementation against the backend.

use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const LOGIN_PATH: &str = "/api/auth/user/login";
const VERIFY_PATH: &str = "/api/auth/user/login/verify";
const REFRESH_PATH: &str = "/auth/refresh";
const MEDIA_EMAIL: &str = "EMAIL";

/// Result of a successful send step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeIssued {
    /// Correlation id the verify step must echo back.
    pub user_id: String,
}

/// Body of the verify call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub user_id: String,
    pub key: String,
    pub otp: String,
    pub media: String,
}

impl VerifyRequest {
    pub fn email(user_id: &str, key: &str, otp: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            key: key.to_string(),
            otp: otp.to_string(),
            media: MEDIA_EMAIL.to_string(),
        }
    }
}

/// Credentials handed out by a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub account_id: Option<String>,
    pub user_id: Option<String>,
    /// Lifetime of the access token in seconds, when the server states it.
    pub expires_in: Option<i64>,
}

/// Outcome of a verify call that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Accepted(IssuedCredentials),
    Rejected { message: String },
}

/// Token pair returned by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub token: String,
    /// Absent when the server keeps the previous refresh token valid.
    pub refresh_token: Option<String>,
}

/// Calls the identity service makes on behalf of the console.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Ask the server to email a code to `key`.
    async fn request_code(&self, key: &str) -> AuthResult<CodeIssued>;

    /// Submit a code. Client-side rejections come back as
    /// [`VerifyOutcome::Rejected`]; transport and server faults as errors.
    async fn verify_code(&self, request: &VerifyRequest) -> AuthResult<VerifyOutcome>;

    /// Exchange a refresh token for a new token pair.
    async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshedTokens>;
}

/// Pull the session credential out of a verify response.
///
/// The token may arrive in the body (`token` or `accessToken`) or in the
/// `Authorization` header, with or without a `Bearer ` prefix. When both are
/// present the body wins.
pub fn extract_credentials(body: &Value, authorization: Option<&str>) -> Option<IssuedCredentials> {
    let header_token = authorization
        .map(strip_bearer)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    let access_token = string_field(body, &["token", "accessToken"]).or(header_token)?;

    Some(IssuedCredentials {
        access_token,
        refresh_token: string_field(body, &["refreshToken"]),
        account_id: string_field(body, &["accountId"]),
        user_id: string_field(body, &["userId"]),
        expires_in: body.get("expiresIn").and_then(Value::as_i64),
    })
}

fn strip_bearer(raw: &str) -> &str {
    let raw = raw.trim();
    match (raw.get(..6), raw.get(6..)) {
        (Some(scheme), Some(rest))
            if scheme.eq_ignore_ascii_case("bearer") && (rest.is_empty() || rest.starts_with(' ')) =>
        {
            rest.trim()
        }
        _ => raw,
    }
}

/// First non-empty value among `keys`, accepting strings and numbers.
fn string_field(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match body.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Human-readable message from an error payload, if it carries one.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| string_field(&v, &["message", "error"]))
        .unwrap_or_default()
}

/// reqwest implementation of [`IdentityApi`].
#[derive(Clone)]
pub struct IdentityClient {
    http_client: reqwest::Client,
    api_url: String,
}

impl IdentityClient {
    /// Create a client for the backend at `api_url`.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> AuthResult<Self> {
        let api_url: String = api_url.into();
        url::Url::parse(&api_url)?;

        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

#[async_trait]
impl IdentityApi for IdentityClient {
    async fn request_code(&self, key: &str) -> AuthResult<CodeIssued> {
        debug!("Requesting login code");

        let response = self
            .http_client
            .post(self.endpoint(LOGIN_PATH))
            .json(&serde_json::json!({ "key": key, "media": MEDIA_EMAIL }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, "Login code request rejected");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let value: Value = serde_json::from_str(&body)?;
        let user_id = string_field(&value, &["userId"]).ok_or_else(|| AuthError::Rejected {
            status: status.as_u16(),
            message: "Response did not include a userId".to_string(),
        })?;

        Ok(CodeIssued { user_id })
    }

    async fn verify_code(&self, request: &VerifyRequest) -> AuthResult<VerifyOutcome> {
        debug!(user_id = %request.user_id, "Verifying login code");

        let response = self
            .http_client
            .post(self.endpoint(VERIFY_PATH))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let authorization = response
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if status.is_server_error() {
            warn!(status = %status, "Identity service failed during verification");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        if !status.is_success() {
            debug!(status = %status, "Login code rejected");
            return Ok(VerifyOutcome::Rejected {
                message: error_message(&body),
            });
        }

        let value: Value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body)?
        };

        match extract_credentials(&value, authorization.as_deref()) {
            Some(credentials) => Ok(VerifyOutcome::Accepted(credentials)),
            None => {
                warn!("Verification succeeded without a credential in body or header");
                Ok(VerifyOutcome::Rejected {
                    message: "No credential in verification response".to_string(),
                })
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshedTokens> {
        debug!("Refreshing access token");

        let response = self
            .http_client
            .post(self.endpoint(REFRESH_PATH))
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, "Token refresh rejected");
            return Err(AuthError::RefreshFailed(format!(
                "{} {}",
                status,
                error_message(&body)
            )));
        }

        let value: Value = serde_json::from_str(&body)?;
        let token = string_field(&value, &["token", "accessToken"]).ok_or_else(|| {
            AuthError::RefreshFailed("Refresh response did not include a token".to_string())
        })?;

        Ok(RefreshedTokens {
            token,
            refresh_token: string_field(&value, &["refreshToken"]),
        })
    }
}
