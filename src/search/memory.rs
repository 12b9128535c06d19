//! In-memory search engine double.
//!
//! Approximates the engine's observable read contract (match semantics,
//! descending sort, offset pagination, upsert-by-id) deterministically so
//! pipeline and read-service tests need no running cluster. Writes can be
//! made to fail per id to exercise partial bulk failure handling.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{BulkItem, BulkReport, Page, SearchError, SearchProvider};
use crate::entity::Document;

#[derive(Default)]
pub struct MemorySearchProvider {
    indexes: DashMap<String, DashMap<String, Value>>,
    /// Ids whose bulk writes are rejected with a 429, for failure tests.
    reject_ids: DashSet<String>,
    bulk_calls: AtomicUsize,
    documents_written: AtomicUsize,
}

impl MemorySearchProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bulk requests issued so far.
    #[must_use]
    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    /// Number of documents successfully written so far.
    #[must_use]
    pub fn documents_written(&self) -> usize {
        self.documents_written.load(Ordering::SeqCst)
    }

    /// Number of documents currently held in `index`.
    #[must_use]
    pub fn index_len(&self, index: &str) -> usize {
        self.indexes.get(index).map_or(0, |m| m.len())
    }

    #[must_use]
    pub fn has_index(&self, index: &str) -> bool {
        self.indexes.contains_key(index)
    }

    /// Make future bulk writes of `id` fail with a 429 item status.
    pub fn reject_id(&self, id: &str) {
        self.reject_ids.insert(id.to_string());
    }

    /// Clear all injected write failures.
    pub fn clear_rejections(&self) {
        self.reject_ids.clear();
    }

    fn collect(&self, index: &str) -> Vec<Value> {
        self.indexes
            .get(index)
            .map(|m| m.iter().map(|entry| entry.value().clone()).collect())
            .unwrap_or_default()
    }
}

/// Field-match semantics: arrays match when any element equals the argument,
/// strings match on case-insensitive containment, scalars on equality.
fn field_matches(value: &Value, arg: &str) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| field_matches(item, arg)),
        Value::String(s) => s.to_lowercase().contains(&arg.to_lowercase()),
        other => other.to_string() == arg,
    }
}

/// Collect every string anywhere in the document, for full-text matching.
fn string_values<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|item| string_values(item, out)),
        Value::Object(map) => map.values().for_each(|item| string_values(item, out)),
        _ => {}
    }
}

fn sort_key(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NEG_INFINITY)
}

fn doc_id(doc: &Value) -> &str {
    doc["id"].as_str().unwrap_or_default()
}

fn paginate(mut docs: Vec<Value>, page: Page) -> Vec<Value> {
    let offset = page.offset();
    if offset >= docs.len() {
        return Vec::new();
    }
    docs.drain(..offset);
    docs.truncate(page.size);
    docs
}

#[async_trait]
impl SearchProvider for MemorySearchProvider {
    async fn create_index(&self, index: &str, _body: &Value) -> Result<bool, SearchError> {
        if self.indexes.contains_key(index) {
            return Ok(false);
        }
        self.indexes.insert(index.to_string(), DashMap::new());
        Ok(true)
    }

    async fn bulk(&self, index: &str, documents: &[Document]) -> Result<BulkReport, SearchError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        let store = self
            .indexes
            .entry(index.to_string())
            .or_insert_with(DashMap::new);

        let mut report = BulkReport::default();
        for doc in documents {
            if self.reject_ids.contains(&doc.id) {
                report.errors = true;
                report.items.push(BulkItem {
                    id: doc.id.clone(),
                    status: 429,
                    error: Some("rejected by test".to_string()),
                });
                continue;
            }
            let created = !store.contains_key(&doc.id);
            store.insert(doc.id.clone(), doc.body.clone());
            self.documents_written.fetch_add(1, Ordering::SeqCst);
            report.items.push(BulkItem {
                id: doc.id.clone(),
                status: if created { 201 } else { 200 },
                error: None,
            });
        }
        Ok(report)
    }

    async fn search(&self, index: &str, query: &str, page: Page) -> Result<Vec<Value>, SearchError> {
        let needle = query.to_lowercase();
        let mut docs: Vec<Value> = self
            .collect(index)
            .into_iter()
            .filter(|doc| {
                let mut strings = Vec::new();
                string_values(doc, &mut strings);
                strings.iter().any(|s| s.to_lowercase().contains(&needle))
            })
            .collect();
        docs.sort_by(|a, b| doc_id(a).cmp(doc_id(b)));
        Ok(paginate(docs, page))
    }

    async fn get_all(
        &self,
        index: &str,
        sort: Option<&str>,
        filter: Option<(&str, &str)>,
        page: Page,
    ) -> Result<Vec<Value>, SearchError> {
        let mut docs = self.collect(index);

        if let Some((name, arg)) = filter {
            docs.retain(|doc| field_matches(&doc[name], arg));
        }

        match sort {
            Some(field) => docs.sort_by(|a, b| {
                sort_key(&b[field])
                    .partial_cmp(&sort_key(&a[field]))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| doc_id(a).cmp(doc_id(b)))
            }),
            None => docs.sort_by(|a, b| doc_id(a).cmp(doc_id(b))),
        }

        Ok(paginate(docs, page))
    }

    async fn get_by_id(&self, index: &str, id: &str) -> Result<Option<Value>, SearchError> {
        Ok(self.indexes.get(index).and_then(|m| m.get(id).map(|d| d.clone())))
    }
}
