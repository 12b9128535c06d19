//! Redis cache provider.
//!
//! Values are written with `SET key value EX ttl`; expiry is handled
//! entirely by Redis. The connection manager multiplexes one connection
//! and is safe to clone across concurrent request handlers.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

use super::{CacheError, CacheProvider};
use crate::resilience::{retry, RetryConfig};

pub struct RedisCacheProvider {
    connection: ConnectionManager,
}

impl RedisCacheProvider {
    /// Connect with startup-mode retry (fails fast if config is wrong).
    pub async fn new(connection_string: &str) -> Result<Self, CacheError> {
        let client = Client::open(connection_string)
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        let connection = retry("cache_connect", &RetryConfig::startup(), || async {
            ConnectionManager::new(client.clone()).await
        })
        .await
        .map_err(|e: redis::RedisError| CacheError::Backend(e.to_string()))?;

        Ok(Self { connection })
    }

    /// Reuse an existing connection manager.
    #[must_use]
    pub fn from_connection(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    /// Get a clone of the connection manager (for sharing with the
    /// checkpoint store).
    #[must_use]
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let conn = self.connection.clone();
        let key = key.to_string();

        retry("cache_get", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let key = key.clone();
            async move {
                let value: Option<String> = conn.get(&key).await?;
                Ok(value)
            }
        })
        .await
        .map_err(|e: redis::RedisError| CacheError::Backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let conn = self.connection.clone();
        let key = key.to_string();
        let value = value.to_string();
        let ttl_secs = ttl.as_secs().max(1);

        retry("cache_set", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let key = key.clone();
            let value = value.clone();
            async move {
                let _: () = conn.set_ex(&key, &value, ttl_secs).await?;
                Ok(())
            }
        })
        .await
        .map_err(|e: redis::RedisError| CacheError::Backend(e.to_string()))
    }
}
