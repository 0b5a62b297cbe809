//! Cache-backed pieces of the session lifecycle.
//!
//! - [`blacklist`] -- fast-path rejection of revoked refresh-token hashes.
//! - [`state`] -- one-time OAuth state nonces.
//! - [`redis_cache`] / [`memory`] -- [`CacheStore`](tollgate_core::cache::CacheStore)
//!   implementations.

pub mod blacklist;
pub mod memory;
pub mod redis_cache;
pub mod state;

pub use blacklist::{RetryPolicy, RevocationBlacklist};
pub use memory::MemoryCache;
pub use redis_cache::RedisCache;
pub use state::OneTimeStateStore;
