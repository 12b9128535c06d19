// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Incremental extract-transform-load pipeline.
//!
//! ```text
//! ┌────────────┐   changed ids    ┌─────────────┐   documents   ┌────────────┐
//! │ Checkpoint │ ──► Extractor ──►│   Builder   │──────────────►│   Writer   │
//! │   Store    │     (paged)      │ (denormalize)│              │ (bulk upsert)
//! └────────────┘                  └─────────────┘               └────────────┘
//!        ▲                                                            │
//!        └──────────────── advance after entity pass ─────────────────┘
//! ```
//!
//! The [`orchestrator::SyncOrchestrator`] drives one pass per poll interval:
//! for each entity type it pages changed ids out of Postgres, denormalizes
//! them into documents, and bulk-upserts them into the search index, then
//! advances the entity's checkpoint.

pub mod build;
pub mod extract;
pub mod memory;
pub mod orchestrator;
pub mod write;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::entity::{Document, EntityKind};
use crate::search::SearchError;

pub use extract::PgChangeSource;
pub use memory::MemoryChangeSource;
pub use orchestrator::{PassSummary, SyncOrchestrator, SyncState};
pub use write::{BulkOutcome, IndexWriter};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Relational store error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Yields pages of changed entity ids.
///
/// Paging is caller-driven: the orchestrator advances `offset` until an
/// empty page comes back, which terminates the sequence. All rows changed
/// after `since` (directly or through a joined dependent entity) are
/// eventually yielded, deduplicated; no other ordering is guaranteed.
#[async_trait]
pub trait ChangeExtractor: Send + Sync {
    async fn changed_ids(
        &self,
        entity: EntityKind,
        since: DateTime<Utc>,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<String>, SyncError>;
}

/// Joins and denormalizes full documents for a page of ids.
///
/// Returns one document per input id that still resolves; ids with no
/// matching row are silently omitted, so callers must not assume a 1:1
/// count.
#[async_trait]
pub trait DocumentBuilder: Send + Sync {
    async fn build(&self, entity: EntityKind, ids: &[String]) -> Result<Vec<Document>, SyncError>;
}
