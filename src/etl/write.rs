// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index writing: idempotent index creation and bulk upserts.

use std::sync::Arc;
use tracing::{debug, error, warn};

use super::SyncError;
use crate::entity::{Document, EntityKind};
use crate::search::{mapping, SearchProvider};

/// Outcome of one bulk upsert call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    /// Nothing to write; no request was issued.
    Skipped,
    /// Every document was accepted.
    Indexed(usize),
    /// Some items were rejected by the index; accepted items remain written.
    PartialFailure { indexed: usize, failed: usize },
}

impl BulkOutcome {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !matches!(self, BulkOutcome::PartialFailure { .. })
    }
}

/// Writes denormalized documents into the search index.
pub struct IndexWriter {
    provider: Arc<dyn SearchProvider>,
}

impl IndexWriter {
    #[must_use]
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Create the entity's index with its fixed settings/mappings if absent.
    ///
    /// An already-existing index is success; any other creation error is
    /// logged by the provider and propagated.
    pub async fn ensure_index(&self, entity: EntityKind) -> Result<(), SyncError> {
        let index = entity.index_name();
        let created = self
            .provider
            .create_index(index, &mapping::index_body(entity))
            .await?;
        if created {
            debug!(index = %index, "Created search index");
        }
        Ok(())
    }

    /// Upsert a page of documents in a single bulk request.
    ///
    /// An empty page is a warn-and-skip no-op. Per-item failures are logged
    /// individually and reported through [`BulkOutcome::PartialFailure`];
    /// duplicate ids overwrite the prior document.
    pub async fn bulk_upsert(
        &self,
        entity: EntityKind,
        documents: &[Document],
    ) -> Result<BulkOutcome, SyncError> {
        let index = entity.index_name();
        if documents.is_empty() {
            warn!(index = %index, "No documents to index, skipping bulk write");
            return Ok(BulkOutcome::Skipped);
        }

        let report = self.provider.bulk(index, documents).await?;

        let failed = report.failed_count();
        if report.errors || failed > 0 {
            for item in report.failures() {
                error!(
                    index = %index,
                    id = %item.id,
                    status = item.status,
                    error = item.error.as_deref().unwrap_or("unknown"),
                    "Bulk item rejected"
                );
            }
            crate::metrics::record_bulk_failures(index, failed);
            let indexed = documents.len().saturating_sub(failed);
            crate::metrics::record_documents_indexed(index, indexed);
            return Ok(BulkOutcome::PartialFailure { indexed, failed });
        }

        crate::metrics::record_documents_indexed(index, documents.len());
        Ok(BulkOutcome::Indexed(documents.len()))
    }
}
