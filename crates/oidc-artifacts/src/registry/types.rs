//! Bearer token records.

use serde::Serialize;

/// Which half of a token pair a record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Presented to resource servers.
    AccessToken,
    /// Exchanged for a new pair.
    RefreshToken,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}

/// A server-side bearer token. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub token: String,
    pub kind: TokenKind,
    pub client_id: String,
    pub user_id: String,
    pub scope: String,
    /// Unix seconds; the record is invalid at and after this instant.
    pub expires_at: i64,
    /// For refresh tokens, the access token issued alongside it.
    pub paired_with: Option<String>,
}

impl TokenRecord {
    /// Check if the record has expired at `now`.
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// Token metadata safe to hand back to callers (no token string).
#[derive(Debug, Clone, Serialize)]
pub struct TokenInfo {
    pub kind: TokenKind,
    pub client_id: String,
    pub user_id: String,
    pub scope: String,
    pub expires_at: i64,
}

impl From<&TokenRecord> for TokenInfo {
    fn from(record: &TokenRecord) -> Self {
        Self {
            kind: record.kind,
            client_id: record.client_id.clone(),
            user_id: record.user_id.clone(),
            scope: record.scope.clone(),
            expires_at: record.expires_at,
        }
    }
}

/// A token pair returned from issuance or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub scope: String,
}
