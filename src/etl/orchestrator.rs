// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The sync poll loop.
//!
//! A single cooperative loop with two states, published on a watch channel:
//!
//! ```text
//!            timer tick
//!   Polling ───────────► Syncing
//!      ▲                    │
//!      └──── pass done ─────┘
//! ```
//!
//! During a pass each entity type is processed sequentially: read the
//! checkpoint, page changed ids, build documents, bulk-upsert, then advance
//! the checkpoint. The advance target is a timestamp captured *before*
//! extraction began for that entity, so rows modified mid-pass are picked up
//! again next pass instead of being skipped (at the cost of occasionally
//! reindexing a document twice, which the idempotent upsert absorbs).
//!
//! An entity whose backends stay down past the retry budget is skipped for
//! the pass; the loop itself never terminates on entity errors.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::write::{BulkOutcome, IndexWriter};
use super::{ChangeExtractor, DocumentBuilder, SyncError};
use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::entity::EntityKind;

/// Orchestrator state, observable via [`SyncOrchestrator::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Idle between passes.
    Polling,
    /// A pass is in progress.
    Syncing,
}

/// Result of one full pass over all entity types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Documents accepted by the index across all entities.
    pub documents_indexed: usize,
    /// Entities skipped after retry exhaustion.
    pub failed_entities: usize,
    /// Entities that finished with at least one rejected bulk item.
    pub partial_failures: usize,
}

struct EntityOutcome {
    documents: usize,
    clean: bool,
}

pub struct SyncOrchestrator {
    checkpoints: Arc<dyn CheckpointStore>,
    extractor: Arc<dyn ChangeExtractor>,
    builder: Arc<dyn DocumentBuilder>,
    writer: IndexWriter,
    poll_interval: Duration,
    page_size: usize,
    advance_on_partial_failure: bool,
    state: watch::Sender<SyncState>,
}

impl SyncOrchestrator {
    #[must_use]
    pub fn new(
        checkpoints: Arc<dyn CheckpointStore>,
        extractor: Arc<dyn ChangeExtractor>,
        builder: Arc<dyn DocumentBuilder>,
        writer: IndexWriter,
        config: &Config,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Polling);
        Self {
            checkpoints,
            extractor,
            builder,
            writer,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            page_size: config.page_size,
            advance_on_partial_failure: config.advance_on_partial_failure,
            state,
        }
    }

    /// Subscribe to state transitions.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Run until `shutdown` flips to true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval = ?self.poll_interval, "Sync orchestrator started");
        loop {
            let _ = self.state.send(SyncState::Syncing);
            let started = Instant::now();
            let summary = self.sync_pass().await;
            crate::metrics::record_pass(&summary, started.elapsed());
            info!(
                indexed = summary.documents_indexed,
                failed_entities = summary.failed_entities,
                elapsed = ?started.elapsed(),
                "Sync pass complete"
            );
            let _ = self.state.send(SyncState::Polling);

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Sync orchestrator shutting down");
                        return;
                    }
                }
            }
        }
    }

    /// One full pass over all entity types, in fixed order.
    ///
    /// Entity-level errors are logged and counted, never fatal.
    pub async fn sync_pass(&self) -> PassSummary {
        let mut summary = PassSummary::default();
        for entity in EntityKind::ALL {
            match self.sync_entity(entity).await {
                Ok(outcome) => {
                    summary.documents_indexed += outcome.documents;
                    if !outcome.clean {
                        summary.partial_failures += 1;
                    }
                }
                Err(err) => {
                    error!(entity = %entity, error = %err, "Entity sync failed, skipping for this pass");
                    crate::metrics::record_entity_failure(entity.index_name());
                    summary.failed_entities += 1;
                }
            }
        }
        summary
    }

    async fn sync_entity(&self, entity: EntityKind) -> Result<EntityOutcome, SyncError> {
        let since = self.checkpoints.last_sync(entity).await?;
        // Captured before extraction: the checkpoint may only advance to a
        // point we know we have fully read past.
        let pass_start = Utc::now();

        let mut offset: u64 = 0;
        let mut documents = 0usize;
        let mut clean = true;

        loop {
            let ids = self
                .extractor
                .changed_ids(entity, since, offset, self.page_size)
                .await?;
            if ids.is_empty() {
                break;
            }
            offset += ids.len() as u64;

            let page = self.builder.build(entity, &ids).await?;
            self.writer.ensure_index(entity).await?;
            match self.writer.bulk_upsert(entity, &page).await? {
                BulkOutcome::Skipped => {}
                BulkOutcome::Indexed(n) => documents += n,
                BulkOutcome::PartialFailure { indexed, .. } => {
                    documents += indexed;
                    clean = false;
                }
            }
        }

        if clean || self.advance_on_partial_failure {
            if !clean {
                warn!(
                    entity = %entity,
                    "Advancing checkpoint despite rejected bulk items; rejected documents will not be retried"
                );
            }
            self.checkpoints.set_last_sync(entity, pass_start).await?;
        } else {
            warn!(
                entity = %entity,
                "Holding checkpoint back after rejected bulk items; the page will be reprocessed next pass"
            );
        }

        Ok(EntityOutcome { documents, clean })
    }
}
