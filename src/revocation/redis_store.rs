use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::{AsyncCommands, RedisError};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::revocation::RevocationStore;

/// Redis store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL (redis://...)
    pub url: String,

    /// Connection pool size
    pub pool_size: usize,

    /// Connection timeout in seconds
    pub connection_timeout: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 16,
            connection_timeout: 5,
        }
    }
}

/// Redis-backed revocation store
pub struct RedisRevocationStore {
    /// Redis connection pool
    pool: Pool,

    /// Key prefix for all revocation entries
    prefix: String,
}

impl RedisRevocationStore {
    /// Create a new RedisRevocationStore with the given configuration
    pub async fn new(config: RedisConfig) -> Result<Self, CacheError> {
        let cfg = Config::from_url(config.url.as_str());
        let pool = cfg.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis pool: {}", e))
        })?;

        // Test connection
        let mut conn = pool
            .get()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis ping failed: {}", e)))?;

        Ok(Self {
            pool,
            prefix: "commerce_gateway:revoked:".to_string(),
        })
    }

    /// Set the key prefix
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Get the full key with prefix
    fn get_prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Handle Redis errors
    fn handle_redis_error(&self, err: RedisError) -> CacheError {
        match err.kind() {
            redis::ErrorKind::IoError => {
                CacheError::ConnectionError(format!("Redis IO error: {}", err))
            }
            redis::ErrorKind::ResponseError => {
                CacheError::RetrieveError(format!("Redis response error: {}", err))
            }
            _ => CacheError::StoreError(format!("Redis error: {}", err)),
        }
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let prefixed_key = self.get_prefixed_key(key);

        let mut conn = self.pool.get().await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to get Redis connection: {}", e))
        })?;

        // Set with expiration
        let _: () = conn
            .set_ex(&prefixed_key, value, ttl.as_secs() as usize)
            .await
            .map_err(|e| self.handle_redis_error(e))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let prefixed_key = self.get_prefixed_key(key);

        let mut conn = self.pool.get().await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to get Redis connection: {}", e))
        })?;

        let value: Option<String> = conn
            .get(&prefixed_key)
            .await
            .map_err(|e| self.handle_redis_error(e))?;

        Ok(value)
    }
}
