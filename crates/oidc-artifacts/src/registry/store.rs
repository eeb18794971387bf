//! Token storage behind a trait so the backing store can be swapped.
//!
//! [`MemoryTokenStore`] follows the single global lock discipline: every operation
//! takes the one `RwLock`, and `delete` returns the removed record so a caller can
//! act on it without a separate lookup racing another request.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::types::TokenRecord;

/// Keyed bearer token storage.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert or overwrite by token string.
    async fn put(&self, record: TokenRecord);

    /// Look up a record. Does not check expiry.
    async fn get(&self, token: &str) -> Option<TokenRecord>;

    /// Remove a record, returning it if it was present.
    async fn delete(&self, token: &str) -> Option<TokenRecord>;

    /// Remove every record with `expires_at <= now`. Returns the number removed.
    async fn sweep(&self, now: i64) -> usize;

    /// Number of records currently held.
    async fn len(&self) -> usize;
}

/// In-memory, non-persistent token store.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    records: Arc<RwLock<HashMap<String, TokenRecord>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, record: TokenRecord) {
        self.records.write().await.insert(record.token.clone(), record);
    }

    async fn get(&self, token: &str) -> Option<TokenRecord> {
        self.records.read().await.get(token).cloned()
    }

    async fn delete(&self, token: &str) -> Option<TokenRecord> {
        self.records.write().await.remove(token)
    }

    async fn sweep(&self, now: i64) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        before - records.len()
    }

    async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

impl std::fmt::Debug for MemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTokenStore").finish()
    }
}
