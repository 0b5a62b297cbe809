//! Redis-backed [`CacheStore`].

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tollgate_core::cache::CacheStore;
use tollgate_core::error::CacheError;

/// Cache store over a multiplexed Redis connection.
///
/// The connection is opened by the process entry point and injected here;
/// clones share the same underlying socket.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Open a client for `url` and establish a multiplexed connection.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(CacheError::backend)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(CacheError::backend)?;
        Ok(Self::new(conn))
    }
}

/// Redis rejects zero expiries, so sub-millisecond TTLs round up.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.pset_ex::<_, _, ()>(key, value, ttl_millis(ttl))
            .await
            .map_err(CacheError::backend)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(key)
            .await
            .map_err(CacheError::backend)
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await.map_err(CacheError::backend)?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::backend)?;
        Ok(())
    }
}
