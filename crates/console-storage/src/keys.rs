//! Storage key constants.

/// Storage keys used by the console session.
pub struct StorageKeys;

impl StorageKeys {
    /// Bearer access token
    pub const TOKEN: &'static str = "token";

    /// Refresh token
    pub const REFRESH_TOKEN: &'static str = "refreshToken";

    /// Account the session acts on behalf of
    pub const ACCOUNT_ID: &'static str = "accountId";

    /// Authenticated user
    pub const USER_ID: &'static str = "userId";

    /// Session metadata (JSON: issuedAt, expiresAt)
    pub const SESSION_META: &'static str = "sessionMeta";

    /// Every key that belongs to a session; cleared together.
    pub const SESSION_KEYS: [&'static str; 5] = [
        Self::TOKEN,
        Self::REFRESH_TOKEN,
        Self::ACCOUNT_ID,
        Self::USER_ID,
        Self::SESSION_META,
    ];
}
