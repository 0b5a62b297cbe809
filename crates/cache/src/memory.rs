//! In-process [`CacheStore`] for development and tests.
//!
//! Only key presence and expiry are tracked; values are not retained.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tollgate_core::cache::CacheStore;
use tollgate_core::error::CacheError;

#[derive(Debug, Clone)]
struct Entry {
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Map-backed cache with per-key expiry. Not shared across processes.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    store: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let store = self.store.read().await;
        store.values().filter(|e| !e.is_expired()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn set_with_ttl(&self, key: &str, _value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut store = self.store.write().await;
        store.insert(
            key.to_string(),
            Entry {
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let store = self.store.read().await;
        Ok(store.get(key).is_some_and(|e| !e.is_expired()))
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut store = self.store.write().await;
        Ok(store.remove(key).is_some_and(|e| !e.is_expired()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
