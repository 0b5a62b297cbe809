//! Cache store contract.
//!
//! The session lifecycle only needs existence-with-TTL semantics from the
//! cache: revocation entries and OAuth state nonces carry no payload.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store `key` with `value`, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// True if `key` is present and not expired.
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove `key`. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Cheap reachability probe used by the health endpoint.
    async fn ping(&self) -> Result<(), CacheError>;
}
