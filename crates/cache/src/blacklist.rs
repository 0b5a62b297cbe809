//! Revocation blacklist for refresh-token hashes.
//!
//! Presence of a hash means "reject". Entries live for the session's remaining
//! lifetime so they never outlast what the session row would reject anyway.
//! The session table stays authoritative; this is only a fast path.

use std::sync::Arc;
use std::time::Duration;

use tollgate_core::cache::CacheStore;
use tollgate_core::error::CacheError;

const KEY_PREFIX: &str = "blacklist:";

/// Default number of attempts for a best-effort blacklist write.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Default pause before the second attempt; grows linearly afterwards.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Bounded retry for best-effort cache writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause after the n-th failure is `backoff * n`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

#[derive(Clone)]
pub struct RevocationBlacklist {
    cache: Arc<dyn CacheStore>,
}

fn key(hash: &str) -> String {
    format!("{KEY_PREFIX}{hash}")
}

impl RevocationBlacklist {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    /// Record `hash` as rejected for `ttl`. A zero `ttl` means the session has
    /// already expired and nothing is written.
    pub async fn revoke(&self, hash: &str, ttl: Duration) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Ok(());
        }
        self.cache.set_with_ttl(&key(hash), "1", ttl).await
    }

    /// [`revoke`](Self::revoke) with up to `policy.max_attempts` tries.
    ///
    /// Returns the last error once every attempt has failed.
    pub async fn revoke_with_retry(
        &self,
        hash: &str,
        ttl: Duration,
        policy: RetryPolicy,
    ) -> Result<(), CacheError> {
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.revoke(hash, ttl).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(attempt, max_attempts = attempts, error = %e, "Blacklist write failed, retrying");
                    tokio::time::sleep(policy.backoff * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn is_revoked(&self, hash: &str) -> Result<bool, CacheError> {
        self.cache.exists(&key(hash)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;
    use crate::memory::MemoryCache;

    /// Cache whose writes fail a fixed number of times before succeeding.
    struct FlakyCache {
        inner: MemoryCache,
        failures_left: AtomicU32,
        writes: AtomicU32,
    }

    impl FlakyCache {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryCache::new(),
                failures_left: AtomicU32::new(failures),
                writes: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl CacheStore for FlakyCache {
        async fn set_with_ttl(
            &self,
            key: &str,
            value: &str,
            ttl: Duration,
        ) -> Result<(), CacheError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(CacheError::backend("connection reset"));
            }
            self.inner.set_with_ttl(key, value, ttl).await
        }

        async fn exists(&self, key: &str) -> Result<bool, CacheError> {
            self.inner.exists(key).await
        }

        async fn delete(&self, key: &str) -> Result<bool, CacheError> {
            self.inner.delete(key).await
        }

        async fn ping(&self) -> Result<(), CacheError> {
            Ok(())
        }
    }

    const POLICY: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        backoff: Duration::from_millis(10),
    };

    #[tokio::test]
    async fn revoked_hash_is_reported() {
        let blacklist = RevocationBlacklist::new(Arc::new(MemoryCache::new()));
        blacklist
            .revoke("deadbeef", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(blacklist.is_revoked("deadbeef").await.unwrap());
        assert!(!blacklist.is_revoked("cafebabe").await.unwrap());
    }

    #[tokio::test]
    async fn zero_ttl_writes_nothing() {
        let cache = Arc::new(MemoryCache::new());
        let blacklist = RevocationBlacklist::new(cache.clone());
        blacklist.revoke("deadbeef", Duration::ZERO).await.unwrap();
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_from_transient_failures() {
        let cache = Arc::new(FlakyCache::new(2));
        let blacklist = RevocationBlacklist::new(cache.clone());

        blacklist
            .revoke_with_retry("deadbeef", Duration::from_secs(60), POLICY)
            .await
            .unwrap();

        assert_eq!(cache.writes.load(Ordering::SeqCst), 3);
        assert!(blacklist.is_revoked("deadbeef").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_is_bounded() {
        let cache = Arc::new(FlakyCache::new(u32::MAX));
        let blacklist = RevocationBlacklist::new(cache.clone());

        let result = blacklist
            .revoke_with_retry("deadbeef", Duration::from_secs(60), POLICY)
            .await;

        assert_matches!(result, Err(CacheError::Backend(_)));
        assert_eq!(cache.writes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let cache = Arc::new(FlakyCache::new(0));
        let blacklist = RevocationBlacklist::new(cache.clone());
        let policy = RetryPolicy {
            max_attempts: 0,
            backoff: Duration::ZERO,
        };

        blacklist
            .revoke_with_retry("deadbeef", Duration::from_secs(60), policy)
            .await
            .unwrap();
        assert_eq!(cache.writes.load(Ordering::SeqCst), 1);
    }
}
