//! Cache provider abstraction for the cache-aside read path.
//!
//! Entries are serialized JSON payloads with a uniform TTL; expiry and
//! overwrite are the only deletion paths. Concrete backends: Redis in
//! production, an in-memory double for tests.

pub mod key;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use key::derive_key;
pub use memory::MemoryCacheProvider;
pub use redis::RedisCacheProvider;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Polymorphic cache store, safe for concurrent use.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Fetch a serialized payload. Absent or expired keys are `None`,
    /// never an error.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a serialized payload, overwriting any prior value, expiring
    /// after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}
