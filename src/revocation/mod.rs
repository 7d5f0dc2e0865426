pub mod memory_store;
pub mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

pub use memory_store::MemoryRevocationStore;
pub use redis_store::{RedisConfig, RedisRevocationStore};

/// Sentinel value stored for a revoked token
const REVOKED_SENTINEL: &str = "revoked";

/// String-keyed store with per-key TTL backing the revocation cache.
///
/// The backing store must provide atomic get/set semantics per key; expired
/// entries disappear on their own.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Store a value under a key with an absolute expiration
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Retrieve the value for a key, if present and unexpired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
}

/// Black-list of bearer tokens, consulted on every authenticated request.
///
/// Entries expire with the configured token lifetime, so a revoked token is
/// never queryable past its own natural expiry.
pub struct RevocationCache {
    store: Arc<dyn RevocationStore>,
    token_ttl: Duration,
}

impl RevocationCache {
    /// Create a cache over a backing store; `token_ttl` is the configured
    /// token lifetime
    pub fn new(store: Arc<dyn RevocationStore>, token_ttl: Duration) -> Self {
        Self { store, token_ttl }
    }

    /// Mark a token as revoked until its natural expiry
    pub async fn revoke(&self, token: &str) -> Result<(), CacheError> {
        if token.is_empty() {
            return Ok(());
        }

        self.store
            .put(token, REVOKED_SENTINEL, self.token_ttl)
            .await
    }

    /// Whether a token has been revoked.
    ///
    /// A missing or empty token is defined as not revoked; this check never
    /// blocks unauthenticated flows.
    pub async fn is_revoked(&self, token: Option<&str>) -> Result<bool, CacheError> {
        let token = match token {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(false),
        };

        let cached = self.store.get(token).await?;
        Ok(cached.map_or(false, |value| !value.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> RevocationCache {
        RevocationCache::new(
            Arc::new(MemoryRevocationStore::new()),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_revoke_then_is_revoked() {
        let cache = cache();

        assert!(!cache.is_revoked(Some("token123")).await.unwrap());

        cache.revoke("token123").await.unwrap();
        assert!(cache.is_revoked(Some("token123")).await.unwrap());

        // Other tokens are unaffected
        assert!(!cache.is_revoked(Some("token456")).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let cache = cache();

        cache.revoke("token123").await.unwrap();
        cache.revoke("token123").await.unwrap();

        assert!(cache.is_revoked(Some("token123")).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_or_empty_token_is_not_revoked() {
        let cache = cache();

        assert!(!cache.is_revoked(None).await.unwrap());
        assert!(!cache.is_revoked(Some("")).await.unwrap());

        // Revoking the empty token is a no-op, not an entry
        cache.revoke("").await.unwrap();
        assert!(!cache.is_revoked(Some("")).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_revoked_does_not_mutate_state() {
        let cache = cache();

        for _ in 0..3 {
            assert!(!cache.is_revoked(Some("token123")).await.unwrap());
        }

        cache.revoke("token123").await.unwrap();
        for _ in 0..3 {
            assert!(cache.is_revoked(Some("token123")).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_entry_expires_with_token_lifetime() {
        let cache = RevocationCache::new(
            Arc::new(MemoryRevocationStore::new()),
            Duration::from_millis(20),
        );

        cache.revoke("token123").await.unwrap();
        assert!(cache.is_revoked(Some("token123")).await.unwrap());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!cache.is_revoked(Some("token123")).await.unwrap());
    }
}
