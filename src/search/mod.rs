// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search engine abstraction.
//!
//! [`SearchProvider`] hides the concrete engine behind an object-safe trait
//! with two variants: [`elastic::ElasticProvider`] speaking the REST API in
//! production, and [`memory::MemorySearchProvider`] for deterministic tests.
//!
//! # Bulk wire format
//!
//! Writes use the engine's newline-delimited JSON bulk format, one
//! action/body pair per document:
//!
//! ```text
//! {"index":{"_index":"movies","_id":"f-1"}}
//! {"id":"f-1","title":"...", ...}
//! ```
//!
//! Indexing the same `_id` twice overwrites the prior document, which is
//! what makes a whole sync pass safely repeatable.

pub mod elastic;
pub mod mapping;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::entity::Document;

pub use elastic::ElasticProvider;
pub use memory::MemorySearchProvider;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search backend error: {0}")]
    Backend(String),
}

/// 1-based pagination window, translated to `offset = (number - 1) * size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub size: usize,
    pub number: usize,
}

impl Page {
    #[must_use]
    pub fn new(size: usize, number: usize) -> Self {
        Self {
            size: size.max(1),
            number: number.max(1),
        }
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        (self.number - 1) * self.size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { size: 10, number: 1 }
    }
}

/// Per-item result of a bulk write.
#[derive(Debug, Clone)]
pub struct BulkItem {
    pub id: String,
    pub status: u16,
    pub error: Option<String>,
}

impl BulkItem {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outcome of one bulk request, item by item.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    /// Engine-reported overall error flag.
    pub errors: bool,
    pub items: Vec<BulkItem>,
}

impl BulkReport {
    pub fn failures(&self) -> impl Iterator<Item = &BulkItem> {
        self.items.iter().filter(|item| !item.is_success())
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }
}

/// Polymorphic search engine client, safe for concurrent use.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Create `index` with the given settings/mappings body.
    ///
    /// Returns `false` if the index already existed (not an error); any
    /// other creation failure is an error.
    async fn create_index(&self, index: &str, body: &Value) -> Result<bool, SearchError>;

    /// Single bulk upsert request for all `documents`, reporting per-item
    /// statuses.
    async fn bulk(&self, index: &str, documents: &[Document]) -> Result<BulkReport, SearchError>;

    /// Full-text match across default fields with fuzzy matching.
    async fn search(&self, index: &str, query: &str, page: Page) -> Result<Vec<Value>, SearchError>;

    /// Match-all listing. `sort` orders descending by that field with
    /// relevance as tiebreak; `filter` ANDs a field match into the query.
    async fn get_all(
        &self,
        index: &str,
        sort: Option<&str>,
        filter: Option<(&str, &str)>,
        page: Page,
    ) -> Result<Vec<Value>, SearchError>;

    /// Direct lookup. Not-found is a normal `None`, never an error.
    async fn get_by_id(&self, index: &str, id: &str) -> Result<Option<Value>, SearchError>;
}

/// Encode documents into the newline-delimited bulk body.
#[must_use]
pub fn encode_bulk(index: &str, documents: &[Document]) -> String {
    let mut body = String::new();
    for doc in documents {
        let action = serde_json::json!({"index": {"_index": index, "_id": doc.id}});
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&doc.body.to_string());
        body.push('\n');
    }
    body
}
