//! Session persistence, expiry checks, and token refresh.
//!
//! `SessionStore` is the only component that touches the storage keys. Every
//! read and write of a session happens under one mutex and every write is a
//! single batch, so no caller can observe a half-replaced session.

use crate::identity_client::{IdentityApi, IssuedCredentials};
use crate::jwt::expiry_from_jwt;
use crate::{AuthError, AuthResult};
use chrono::{DateTime, Duration, Utc};
use console_storage::{SecureStorage, StorageKeys};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tokens are treated as expired this long before their stated expiry.
const EXPIRY_SKEW_SECS: i64 = 30;

/// Authentication status for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    /// Logged in with a usable session.
    LoggedIn {
        user_id: String,
        expires_at: Option<DateTime<Utc>>,
    },
    /// No session stored.
    NotLoggedIn,
    /// A session is stored but its access token has expired.
    Expired,
}

/// The credentials of the single active login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub account_id: String,
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
    /// `None` means valid until the backend says otherwise.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session from verify-step credentials.
    ///
    /// `fallback_user_id` (the challenge correlation id) is used when the
    /// response omits `userId`; `accountId` falls back to the user id.
    pub fn from_credentials(
        credentials: IssuedCredentials,
        fallback_user_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let user_id = credentials
            .user_id
            .unwrap_or_else(|| fallback_user_id.to_string());
        let account_id = credentials.account_id.unwrap_or_else(|| user_id.clone());
        let expires_at = credentials
            .expires_in
            .map(|secs| issued_at + Duration::seconds(secs))
            .or_else(|| expiry_from_jwt(&credentials.access_token));

        Self {
            access_token: credentials.access_token,
            refresh_token: credentials.refresh_token,
            account_id,
            user_id,
            issued_at,
            expires_at,
        }
    }

    /// Returns true once the access token is past (or about to pass) its expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|expires_at| expires_at - Duration::seconds(EXPIRY_SKEW_SECS) <= now)
            .unwrap_or(false)
    }

    /// Same identity with a new token pair. Keeps the old refresh token when
    /// the server does not rotate it.
    fn with_tokens(&self, token: String, refresh_token: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            expires_at: expiry_from_jwt(&token),
            access_token: token,
            refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
            account_id: self.account_id.clone(),
            user_id: self.user_id.clone(),
            issued_at: now,
        }
    }
}

/// Persisted alongside the tokens under [`StorageKeys::SESSION_META`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionMeta {
    issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// Owner of the persisted session.
pub struct SessionStore {
    storage: Box<dyn SecureStorage>,
    identity: Arc<dyn IdentityApi>,
    lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(storage: Box<dyn SecureStorage>, identity: Arc<dyn IdentityApi>) -> Self {
        Self {
            storage,
            identity,
            lock: Mutex::new(()),
        }
    }

    /// Current bearer token, if any. No side effects.
    pub fn get_token(&self) -> AuthResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.storage.get(StorageKeys::TOKEN)?)
    }

    /// Replace the whole persisted session in one write.
    pub fn set_session(&self, session: &Session) -> AuthResult<()> {
        let meta = serde_json::to_string(&SessionMeta {
            issued_at: session.issued_at,
            expires_at: session.expires_at,
        })?;

        let mut entries = vec![
            (StorageKeys::TOKEN, session.access_token.as_str()),
            (StorageKeys::ACCOUNT_ID, session.account_id.as_str()),
            (StorageKeys::USER_ID, session.user_id.as_str()),
            (StorageKeys::SESSION_META, meta.as_str()),
        ];
        if let Some(refresh_token) = session.refresh_token.as_deref() {
            entries.push((StorageKeys::REFRESH_TOKEN, refresh_token));
        }

        let stale: &[&str] = if session.refresh_token.is_none() {
            &[StorageKeys::REFRESH_TOKEN]
        } else {
            &[]
        };

        let _guard = self.lock.lock();
        self.storage.replace_many(&entries, stale)?;

        info!(user_id = %session.user_id, "Session stored");
        Ok(())
    }

    /// Remove every session key. Calling this without a session is a no-op.
    pub fn clear(&self) -> AuthResult<()> {
        let _guard = self.lock.lock();
        self.storage.delete_many(&StorageKeys::SESSION_KEYS)?;
        debug!("Session cleared");
        Ok(())
    }

    /// Read the persisted session. `None` when no access token is stored.
    pub fn load(&self) -> AuthResult<Option<Session>> {
        let _guard = self.lock.lock();

        let Some(access_token) = self.storage.get(StorageKeys::TOKEN)? else {
            return Ok(None);
        };

        let user_id = self.storage.get(StorageKeys::USER_ID)?.unwrap_or_default();
        let account_id = self
            .storage
            .get(StorageKeys::ACCOUNT_ID)?
            .unwrap_or_else(|| user_id.clone());
        let refresh_token = self.storage.get(StorageKeys::REFRESH_TOKEN)?;

        let meta = match self.storage.get(StorageKeys::SESSION_META)? {
            Some(raw) => match serde_json::from_str::<SessionMeta>(&raw) {
                Ok(meta) => Some(meta),
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable session metadata");
                    None
                }
            },
            None => None,
        };

        let (issued_at, expires_at) = match meta {
            Some(meta) => (meta.issued_at, meta.expires_at),
            None => (Utc::now(), expiry_from_jwt(&access_token)),
        };

        Ok(Some(Session {
            access_token,
            refresh_token,
            account_id,
            user_id,
            issued_at,
            expires_at,
        }))
    }

    /// Current authentication status.
    pub fn status(&self) -> AuthResult<AuthStatus> {
        Ok(match self.load()? {
            None => AuthStatus::NotLoggedIn,
            Some(session) if session.is_expired_at(Utc::now()) => AuthStatus::Expired,
            Some(session) => AuthStatus::LoggedIn {
                user_id: session.user_id,
                expires_at: session.expires_at,
            },
        })
    }

    /// Exchange the stored refresh token for a new token pair and persist it.
    ///
    /// The session is left in place on failure; the caller decides whether
    /// the failure means teardown.
    pub async fn refresh(&self) -> AuthResult<Session> {
        let current = self.load()?.ok_or(AuthError::NotLoggedIn)?;
        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::RefreshFailed("No refresh token available".to_string()))?;

        let tokens = self
            .identity
            .refresh(&refresh_token)
            .await
            .map_err(|e| match e {
                e @ AuthError::RefreshFailed(_) => e,
                e if e.is_transient() => e,
                other => AuthError::RefreshFailed(other.to_string()),
            })?;

        let refreshed = current.with_tokens(tokens.token, tokens.refresh_token, Utc::now());
        self.set_session(&refreshed)?;

        info!(user_id = %refreshed.user_id, "Session refreshed");
        Ok(refreshed)
    }

    /// Make sure the stored session is usable before an authenticated call.
    ///
    /// - no session: `Ok(None)`
    /// - live session: returned as is
    /// - expired session: refreshed; when the refresh is refused the session
    ///   is cleared, when it fails transiently the session is kept. Either
    ///   way the refresh error is returned
    pub async fn ensure_fresh(&self) -> AuthResult<Option<Session>> {
        let Some(session) = self.load()? else {
            return Ok(None);
        };

        if !session.is_expired_at(Utc::now()) {
            return Ok(Some(session));
        }

        info!(user_id = %session.user_id, "Session expired locally, attempting refresh");
        match self.refresh().await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Refresh unavailable, keeping session");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Refresh refused, clearing session");
                self.clear()?;
                Err(e)
            }
        }
    }
}
