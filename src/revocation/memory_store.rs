use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::CacheError;
use crate::revocation::RevocationStore;

/// In-memory revocation store.
///
/// Used for tests and single-process deployments; entries are dropped
/// lazily once their expiry passes.
pub struct MemoryRevocationStore {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryRevocationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CacheError::StoreError(format!("lock poisoned: {}", e)))?;

        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        {
            let entries = self
                .entries
                .read()
                .map_err(|e| CacheError::RetrieveError(format!("lock poisoned: {}", e)))?;

            match entries.get(key) {
                Some((value, expires_at)) if *expires_at > Instant::now() => {
                    return Ok(Some(value.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Entry expired; drop it
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CacheError::RetrieveError(format!("lock poisoned: {}", e)))?;
        entries.remove(key);

        Ok(None)
    }
}
