// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Durable sync checkpoints: one last-sync timestamp per entity type.
//!
//! Keys follow `"{prefix}:lasttime_{entity}"` with an ISO-8601 value. A key
//! that has never been written reads back as the epoch start, so a fresh
//! deployment reindexes everything on its first pass.
//!
//! Checkpoints are single-writer: only the orchestrator advances them, and
//! only forward (captured-at-start pass timestamps are monotonic).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use thiserror::Error;
use tracing::warn;

use crate::entity::EntityKind;
use crate::resilience::{retry, RetryConfig};

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint backend error: {0}")]
    Backend(String),
}

/// Durable last-sync-time storage per entity type.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Stored value, or the epoch start if never set.
    async fn last_sync(&self, entity: EntityKind) -> Result<DateTime<Utc>, CheckpointError>;

    /// Unconditional overwrite. Callers are responsible for monotonicity.
    async fn set_last_sync(&self, entity: EntityKind, at: DateTime<Utc>) -> Result<(), CheckpointError>;
}

/// Redis-backed checkpoint store.
pub struct RedisCheckpointStore {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisCheckpointStore {
    /// Connect with startup-mode retry (fails fast if config is wrong).
    pub async fn new(connection_string: &str, prefix: &str) -> Result<Self, CheckpointError> {
        let client = Client::open(connection_string)
            .map_err(|e| CheckpointError::Backend(e.to_string()))?;

        let connection = retry("checkpoint_connect", &RetryConfig::startup(), || async {
            ConnectionManager::new(client.clone()).await
        })
        .await
        .map_err(|e: redis::RedisError| CheckpointError::Backend(e.to_string()))?;

        Ok(Self::from_connection(connection, prefix))
    }

    /// Reuse an existing connection manager (shared with the cache provider).
    #[must_use]
    pub fn from_connection(connection: ConnectionManager, prefix: &str) -> Self {
        Self {
            connection,
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, entity: EntityKind) -> String {
        format!("{}:lasttime_{}", self.prefix, entity.index_name())
    }
}

#[async_trait]
impl CheckpointStore for RedisCheckpointStore {
    async fn last_sync(&self, entity: EntityKind) -> Result<DateTime<Utc>, CheckpointError> {
        let conn = self.connection.clone();
        let key = self.key(entity);

        let stored: Option<String> = retry("checkpoint_get", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let key = key.clone();
            async move {
                let value: Option<String> = conn.get(&key).await?;
                Ok(value)
            }
        })
        .await
        .map_err(|e: redis::RedisError| CheckpointError::Backend(e.to_string()))?;

        Ok(match stored {
            Some(raw) => parse_checkpoint(&raw).unwrap_or_else(|| {
                warn!(key = %key, value = %raw, "Unparseable checkpoint, treating as epoch start");
                DateTime::UNIX_EPOCH
            }),
            None => DateTime::UNIX_EPOCH,
        })
    }

    async fn set_last_sync(&self, entity: EntityKind, at: DateTime<Utc>) -> Result<(), CheckpointError> {
        let conn = self.connection.clone();
        let key = self.key(entity);
        let value = at.to_rfc3339();

        retry("checkpoint_set", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let key = key.clone();
            let value = value.clone();
            async move {
                let _: () = conn.set(&key, &value).await?;
                Ok(())
            }
        })
        .await
        .map_err(|e: redis::RedisError| CheckpointError::Backend(e.to_string()))
    }
}

/// Accept RFC 3339 as written by us, plus bare ISO-8601 without an offset
/// (the format legacy deployments stored).
fn parse_checkpoint(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// In-memory checkpoint store for deterministic tests.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    times: DashMap<EntityKind, DateTime<Utc>>,
}

impl MemoryCheckpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn last_sync(&self, entity: EntityKind) -> Result<DateTime<Utc>, CheckpointError> {
        Ok(self
            .times
            .get(&entity)
            .map(|r| *r.value())
            .unwrap_or(DateTime::UNIX_EPOCH))
    }

    async fn set_last_sync(&self, entity: EntityKind, at: DateTime<Utc>) -> Result<(), CheckpointError> {
        self.times.insert(entity, at);
        Ok(())
    }
}
