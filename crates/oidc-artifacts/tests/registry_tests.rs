//! Token registry behaviour under sweeps and concurrent rotation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use oidc_artifacts::error::ArtifactError;
use oidc_artifacts::registry::{MemoryTokenStore, TokenKind, TokenRecord, TokenRegistry, TokenStore};

const T: i64 = 1_700_000_000;

fn record(token: &str, expires_at: i64) -> TokenRecord {
    TokenRecord {
        token: token.to_string(),
        kind: TokenKind::AccessToken,
        client_id: "c1".to_string(),
        user_id: "u1".to_string(),
        scope: "openid".to_string(),
        expires_at,
        paired_with: None,
    }
}

#[tokio::test]
async fn test_sweep_boundary() {
    let store = Arc::new(MemoryTokenStore::new());
    let registry = TokenRegistry::new(store.clone(), 3600, 7200);

    store.put(record("past", T - 100)).await;
    store.put(record("boundary", T)).await;
    store.put(record("future", T + 100)).await;

    assert_eq!(registry.sweep(T).await, 2);
    assert!(store.get("past").await.is_none());
    assert!(store.get("boundary").await.is_none());
    assert_eq!(store.get("future").await.map(|r| r.expires_at), Some(T + 100));
}

#[tokio::test]
async fn test_lookup_does_not_evict() {
    let store = Arc::new(MemoryTokenStore::new());
    let registry = TokenRegistry::new(store.clone(), 3600, 7200);
    store.put(record("stale", T - 1)).await;

    assert!(matches!(registry.validate_access("stale", T).await, Err(ArtifactError::Expired { .. })));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_concurrent_refresh_single_winner() {
    let registry = TokenRegistry::new(Arc::new(MemoryTokenStore::new()), 3600, 7200);
    let pair = registry.issue_pair("c1", "alice", "openid", T).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        let token = pair.refresh_token.clone();
        handles.push(tokio::spawn(async move { registry.refresh(&token, "c1", T + 1).await }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert_eq!(e, ArtifactError::NotFound),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_expired_refresh_is_consumed() {
    let registry = TokenRegistry::new(Arc::new(MemoryTokenStore::new()), 60, 120);
    let pair = registry.issue_pair("c1", "alice", "openid", T).await;

    assert!(matches!(
        registry.refresh(&pair.refresh_token, "c1", T + 120).await,
        Err(ArtifactError::Expired { .. })
    ));
    assert!(matches!(
        registry.refresh(&pair.refresh_token, "c1", T + 121).await,
        Err(ArtifactError::NotFound)
    ));
}

#[tokio::test]
async fn test_rotated_pair_keeps_bindings() {
    let registry = TokenRegistry::new(Arc::new(MemoryTokenStore::new()), 3600, 7200);
    let pair = registry.issue_pair("c1", "alice", "openid email", T).await;
    let rotated = registry.refresh(&pair.refresh_token, "c1", T + 30).await.unwrap();

    assert_ne!(rotated.access_token, pair.access_token);
    assert_ne!(rotated.refresh_token, pair.refresh_token);
    assert_eq!(rotated.scope, "openid email");
    assert_eq!(rotated.token_type, "Bearer");

    let record = registry.validate_access(&rotated.access_token, T + 30).await.unwrap();
    assert_eq!(record.user_id, "alice");
    assert_eq!(record.expires_at, T + 30 + 3600);
}

/// Memory store that counts deletions.
#[derive(Default)]
struct CountingStore {
    inner: MemoryTokenStore,
    deletes: AtomicUsize,
}

#[async_trait::async_trait]
impl TokenStore for CountingStore {
    async fn put(&self, record: TokenRecord) {
        self.inner.put(record).await;
    }

    async fn get(&self, token: &str) -> Option<TokenRecord> {
        self.inner.get(token).await
    }

    async fn delete(&self, token: &str) -> Option<TokenRecord> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(token).await
    }

    async fn sweep(&self, now: i64) -> usize {
        self.inner.sweep(now).await
    }

    async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[tokio::test]
async fn test_refresh_with_access_token_never_removes_it() {
    let store = Arc::new(CountingStore::default());
    let registry = TokenRegistry::new(store.clone(), 3600, 7200);
    let pair = registry.issue_pair("c1", "alice", "openid", T).await;

    assert!(matches!(
        registry.refresh(&pair.access_token, "c1", T).await,
        Err(ArtifactError::WrongArtifactType { .. })
    ));
    assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
    assert!(registry.validate_access(&pair.access_token, T).await.is_ok());
}
