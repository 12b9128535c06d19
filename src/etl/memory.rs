//! In-memory relational source double.
//!
//! Stands in for Postgres in orchestrator and pipeline tests: records carry
//! a modification timestamp and a prebuilt document body, and the extractor
//! and builder contracts behave like the SQL implementations (strict
//! `modified > since`, id-ordered stable paging, missing ids omitted).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

use super::{ChangeExtractor, DocumentBuilder, SyncError};
use crate::entity::{Document, EntityKind};

#[derive(Clone)]
struct SourceRecord {
    modified: DateTime<Utc>,
    body: Value,
}

/// Test double implementing both [`ChangeExtractor`] and
/// [`DocumentBuilder`].
#[derive(Default)]
pub struct MemoryChangeSource {
    records: RwLock<HashMap<EntityKind, HashMap<String, SourceRecord>>>,
}

impl MemoryChangeSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a source record.
    pub fn upsert(&self, entity: EntityKind, id: &str, modified: DateTime<Utc>, body: Value) {
        self.records
            .write()
            .entry(entity)
            .or_default()
            .insert(id.to_string(), SourceRecord { modified, body });
    }

    /// Touch a record's modification time without changing its body.
    pub fn touch(&self, entity: EntityKind, id: &str, modified: DateTime<Utc>) {
        if let Some(record) = self.records.write().entry(entity).or_default().get_mut(id) {
            record.modified = modified;
        }
    }

    /// Drop a record entirely (simulates a row deleted before the build
    /// query ran).
    pub fn remove(&self, entity: EntityKind, id: &str) {
        if let Some(map) = self.records.write().get_mut(&entity) {
            map.remove(id);
        }
    }
}

#[async_trait]
impl ChangeExtractor for MemoryChangeSource {
    async fn changed_ids(
        &self,
        entity: EntityKind,
        since: DateTime<Utc>,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<String>, SyncError> {
        let records = self.records.read();
        let mut ids: Vec<String> = records
            .get(&entity)
            .map(|map| {
                map.iter()
                    .filter(|(_, record)| record.modified > since)
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default();
        ids.sort();
        Ok(ids.into_iter().skip(offset as usize).take(limit).collect())
    }
}

#[async_trait]
impl DocumentBuilder for MemoryChangeSource {
    async fn build(&self, entity: EntityKind, ids: &[String]) -> Result<Vec<Document>, SyncError> {
        let records = self.records.read();
        let map = match records.get(&entity) {
            Some(map) => map,
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| {
                map.get(id)
                    .map(|record| Document::new(id.clone(), record.body.clone()))
            })
            .collect())
    }
}
