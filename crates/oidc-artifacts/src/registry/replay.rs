//! Single-use enforcement for self-contained authorization grants.
//!
//! Each redeemed grant's `jti` is held until the grant's own `exp`; after that the
//! grant fails expiry checks by itself and the entry is dropped by the sweep.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{ArtifactError, ArtifactResult};

/// Denylist of consumed grant identifiers.
#[derive(Clone, Default)]
pub struct ReplayGuard {
    consumed: Arc<RwLock<HashMap<String, i64>>>,
}

impl ReplayGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `jti` as consumed until `exp`.
    ///
    /// Fails with [`ArtifactError::GrantReplayed`] if it was already consumed.
    pub async fn consume(&self, jti: &str, exp: i64) -> ArtifactResult<()> {
        let mut consumed = self.consumed.write().await;
        if consumed.contains_key(jti) {
            return Err(ArtifactError::GrantReplayed);
        }
        consumed.insert(jti.to_owned(), exp);
        Ok(())
    }

    /// Whether `jti` has been consumed.
    pub async fn is_consumed(&self, jti: &str) -> bool {
        self.consumed.read().await.contains_key(jti)
    }

    /// Drop entries whose grant has expired. Returns the number removed.
    pub async fn sweep(&self, now: i64) -> usize {
        let mut consumed = self.consumed.write().await;
        let before = consumed.len();
        consumed.retain(|_, exp| *exp > now);
        before - consumed.len()
    }

    pub async fn len(&self) -> usize {
        self.consumed.read().await.len()
    }
}

impl std::fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGuard").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_consume_once() {
        let guard = ReplayGuard::new();
        assert!(guard.consume("j1", 100).await.is_ok());
        assert_eq!(guard.consume("j1", 100).await, Err(ArtifactError::GrantReplayed));
        assert!(guard.consume("j2", 100).await.is_ok());
        assert!(guard.is_consumed("j1").await);
    }

    #[tokio::test]
    async fn test_sweep_drops_expired() {
        let guard = ReplayGuard::new();
        guard.consume("old", 50).await.unwrap();
        guard.consume("edge", 100).await.unwrap();
        guard.consume("live", 150).await.unwrap();

        assert_eq!(guard.sweep(100).await, 2);
        assert_eq!(guard.len().await, 1);
        assert!(guard.is_consumed("live").await);
    }
}
