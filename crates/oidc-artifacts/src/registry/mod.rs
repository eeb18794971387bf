//! Server-side bookkeeping for bearer tokens that are not self-contained.
//!
//! Lookups never evict; the sweep task does. [`TokenRegistry::validate_access`]
//! therefore checks `expires_at` itself instead of trusting that a swept registry
//! only holds live tokens.

mod replay;
mod store;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::codec::random_b64url;
use crate::config::Config;
use crate::error::{ArtifactError, ArtifactResult};

pub use replay::ReplayGuard;
pub use store::{MemoryTokenStore, TokenStore};
pub use types::{TokenInfo, TokenKind, TokenPair, TokenRecord};

/// Random bytes per bearer token (64 base64url characters).
pub const TOKEN_BYTES: usize = 48;

/// Generate an opaque bearer token string.
#[must_use]
pub fn generate_token() -> String {
    random_b64url(TOKEN_BYTES)
}

/// Issues, validates, rotates and revokes bearer tokens on top of a [`TokenStore`].
#[derive(Clone)]
pub struct TokenRegistry {
    store: Arc<dyn TokenStore>,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, access_ttl: i64, refresh_ttl: i64) -> Self {
        Self { store, access_ttl, refresh_ttl }
    }

    /// Registry over a fresh [`MemoryTokenStore`] with lifetimes from `config`.
    #[must_use]
    pub fn in_memory(config: &Config) -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()), config.access_token_ttl, config.refresh_token_ttl)
    }

    /// Create an access + refresh token pair.
    pub async fn issue_pair(&self, client_id: &str, user_id: &str, scope: &str, now: i64) -> TokenPair {
        let access = generate_token();
        let refresh = generate_token();

        self.store
            .put(TokenRecord {
                token: access.clone(),
                kind: TokenKind::AccessToken,
                client_id: client_id.to_owned(),
                user_id: user_id.to_owned(),
                scope: scope.to_owned(),
                expires_at: now + self.access_ttl,
                paired_with: None,
            })
            .await;

        self.store
            .put(TokenRecord {
                token: refresh.clone(),
                kind: TokenKind::RefreshToken,
                client_id: client_id.to_owned(),
                user_id: user_id.to_owned(),
                scope: scope.to_owned(),
                expires_at: now + self.refresh_ttl,
                paired_with: Some(access.clone()),
            })
            .await;

        tracing::debug!(client_id = %client_id, "Issued token pair");

        TokenPair {
            access_token: access,
            refresh_token: refresh,
            token_type: "Bearer",
            expires_in: self.access_ttl,
            scope: scope.to_owned(),
        }
    }

    /// Validate an access token at `now`.
    pub async fn validate_access(&self, token: &str, now: i64) -> ArtifactResult<TokenRecord> {
        let record = self.store.get(token).await.ok_or(ArtifactError::NotFound)?;
        if record.kind != TokenKind::AccessToken {
            return Err(ArtifactError::wrong_type(
                TokenKind::AccessToken.as_str(),
                record.kind.as_str(),
            ));
        }
        if record.is_expired(now) {
            return Err(ArtifactError::Expired { exp: record.expires_at, now });
        }
        Ok(record)
    }

    /// Refresh a token pair: invalidate old tokens and issue new ones.
    ///
    /// Tokens of any other kind are left untouched. The old refresh token is then
    /// removed before anything else, so of two concurrent refreshes with the same
    /// token only one succeeds.
    pub async fn refresh(&self, refresh_token: &str, client_id: &str, now: i64) -> ArtifactResult<TokenPair> {
        let candidate = self.store.get(refresh_token).await.ok_or(ArtifactError::NotFound)?;
        if candidate.kind != TokenKind::RefreshToken {
            return Err(ArtifactError::wrong_type(
                TokenKind::RefreshToken.as_str(),
                candidate.kind.as_str(),
            ));
        }

        // A token string never changes kind, so only the delete decides the winner.
        let old = self.store.delete(refresh_token).await.ok_or(ArtifactError::NotFound)?;
        if old.client_id != client_id {
            return Err(ArtifactError::ClientMismatch);
        }
        if old.is_expired(now) {
            return Err(ArtifactError::Expired { exp: old.expires_at, now });
        }

        if let Some(ref access) = old.paired_with {
            self.store.delete(access).await;
        }

        Ok(self.issue_pair(&old.client_id, &old.user_id, &old.scope, now).await)
    }

    /// Delete a token. A revoked refresh token takes its paired access token with it.
    pub async fn revoke(&self, token: &str) -> bool {
        let Some(record) = self.store.delete(token).await else {
            return false;
        };
        if let Some(ref access) = record.paired_with {
            self.store.delete(access).await;
        }
        tracing::info!(client_id = %record.client_id, kind = record.kind.as_str(), "Revoked token");
        true
    }

    /// Evict expired tokens. Returns the number removed.
    pub async fn sweep(&self, now: i64) -> usize {
        self.store.sweep(now).await
    }

    /// Start background sweep of expired tokens and consumed grant identifiers.
    pub fn start_sweep_task(&self, replay: ReplayGuard, interval: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = chrono::Utc::now().timestamp();

                let tokens = registry.sweep(now).await;
                if tokens > 0 {
                    tracing::debug!(count = tokens, "Swept expired tokens");
                }

                let grants = replay.sweep(now).await;
                if grants > 0 {
                    tracing::debug!(count = grants, "Swept consumed grant identifiers");
                }
            }
        })
    }
}

impl std::fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRegistry")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn registry() -> TokenRegistry {
        TokenRegistry::in_memory(&Config::for_testing("https://op.example"))
    }

    #[test]
    fn test_generate_token_entropy() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let registry = registry();
        let pair = registry.issue_pair("client1", "alice", "openid", NOW).await;

        let record = registry.validate_access(&pair.access_token, NOW).await.unwrap();
        assert_eq!(record.client_id, "client1");
        assert_eq!(record.user_id, "alice");

        assert_eq!(registry.validate_access("invalid", NOW).await, Err(ArtifactError::NotFound));
    }

    #[tokio::test]
    async fn test_validate_checks_expiry_without_sweep() {
        let registry = registry();
        let pair = registry.issue_pair("client1", "alice", "openid", NOW).await;
        let expires_at = NOW + pair.expires_in;

        assert!(registry.validate_access(&pair.access_token, expires_at - 1).await.is_ok());
        assert!(matches!(
            registry.validate_access(&pair.access_token, expires_at).await,
            Err(ArtifactError::Expired { .. })
        ));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let registry = registry();
        let pair = registry.issue_pair("client1", "alice", "openid", NOW).await;
        assert!(matches!(
            registry.validate_access(&pair.refresh_token, NOW).await,
            Err(ArtifactError::WrongArtifactType { .. })
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotation() {
        let registry = registry();
        let pair = registry.issue_pair("client1", "alice", "openid", NOW).await;

        let new_pair = registry.refresh(&pair.refresh_token, "client1", NOW + 10).await.unwrap();

        // Old access token is invalid
        assert_eq!(
            registry.validate_access(&pair.access_token, NOW + 10).await,
            Err(ArtifactError::NotFound)
        );
        // New access token is valid
        assert!(registry.validate_access(&new_pair.access_token, NOW + 10).await.is_ok());
        // Old refresh token can't be reused
        assert_eq!(
            registry.refresh(&pair.refresh_token, "client1", NOW + 10).await.map(|_| ()),
            Err(ArtifactError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_refresh_with_access_token_leaves_it_intact() {
        let registry = registry();
        let pair = registry.issue_pair("client1", "alice", "openid", NOW).await;
        assert!(registry.refresh(&pair.access_token, "client1", NOW).await.is_err());
        assert!(registry.validate_access(&pair.access_token, NOW).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_other_client() {
        let registry = registry();
        let pair = registry.issue_pair("client1", "alice", "openid", NOW).await;
        assert_eq!(
            registry.refresh(&pair.refresh_token, "client2", NOW).await.map(|_| ()),
            Err(ArtifactError::ClientMismatch)
        );
    }

    #[tokio::test]
    async fn test_revoke_refresh_drops_access() {
        let registry = registry();
        let pair = registry.issue_pair("client1", "alice", "openid", NOW).await;
        assert!(registry.revoke(&pair.refresh_token).await);
        assert!(!registry.revoke(&pair.refresh_token).await);
        assert_eq!(registry.validate_access(&pair.access_token, NOW).await, Err(ArtifactError::NotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_task_evicts() {
        let store = Arc::new(MemoryTokenStore::new());
        let registry = TokenRegistry::new(store.clone(), 3600, 7200);
        store
            .put(TokenRecord {
                token: "stale".into(),
                kind: TokenKind::AccessToken,
                client_id: "c1".into(),
                user_id: "u1".into(),
                scope: "openid".into(),
                expires_at: 0,
                paired_with: None,
            })
            .await;

        let replay = ReplayGuard::new();
        replay.consume("old-jti", 0).await.unwrap();

        let handle = registry.start_sweep_task(replay.clone(), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        handle.abort();

        assert_eq!(store.len().await, 0);
        assert_eq!(replay.len().await, 0);
    }
}
