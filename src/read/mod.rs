// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache-aside read path.
//!
//! Every read derives a canonical key, consults the cache, and falls back to
//! the search index on a miss, writing the result back with a uniform TTL.
//! Three payload states:
//!
//! - hit: decoded and returned without touching the index
//! - miss: key absent or expired; index queried, non-empty result cached
//! - corrupt: payload present but undecodable; logged and treated as a miss
//!
//! Empty results are returned as `None` and never written to the cache, so a
//! document indexed moments later is visible immediately. Cache backend
//! failures degrade to direct index reads rather than failing the request.
//!
//! Pagination is deliberately not part of collection and search keys; the
//! first page fetched for a query shape serves subsequent pages until the
//! entry expires.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{derive_key, CacheProvider};
use crate::entity::EntityKind;
use crate::search::{Page, SearchError, SearchProvider};

/// Serves entity reads through the cache, falling back to the search index.
pub struct ReadService {
    search: Arc<dyn SearchProvider>,
    cache: Arc<dyn CacheProvider>,
    ttl: Duration,
}

impl ReadService {
    #[must_use]
    pub fn new(search: Arc<dyn SearchProvider>, cache: Arc<dyn CacheProvider>, ttl: Duration) -> Self {
        Self { search, cache, ttl }
    }

    /// Single document by id. `None` when the index has no such document.
    pub async fn get_by_id(&self, entity: EntityKind, id: &str) -> Result<Option<Value>, SearchError> {
        let index = entity.index_name();
        let key = derive_key(index, &[("id", id)]);

        if let Some(hit) = self.cache_fetch::<Value>(index, &key).await {
            return Ok(Some(hit));
        }

        match self.search.get_by_id(index, id).await? {
            Some(doc) => {
                self.cache_store(&key, &doc).await;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// Filtered, sorted collection listing. `None` when the page is empty.
    pub async fn get_collection(
        &self,
        entity: EntityKind,
        sort: Option<&str>,
        filter: Option<(&str, &str)>,
        page: Page,
    ) -> Result<Option<Vec<Value>>, SearchError> {
        let index = entity.index_name();
        let filter_dim = filter
            .map(|(name, arg)| format!("{}_{}", name, arg))
            .unwrap_or_else(|| "none".to_string());
        let sort_dim = sort.unwrap_or("none");
        let key = derive_key(index, &[("filter", &filter_dim), ("sort", sort_dim)]);

        if let Some(hit) = self.cache_fetch::<Vec<Value>>(index, &key).await {
            return Ok(Some(hit));
        }

        let docs = self.search.get_all(index, sort, filter, page).await?;
        if docs.is_empty() {
            return Ok(None);
        }
        self.cache_store(&key, &docs).await;
        Ok(Some(docs))
    }

    /// Full-text search. `None` when nothing matched.
    pub async fn get_search(
        &self,
        entity: EntityKind,
        query: &str,
        page: Page,
    ) -> Result<Option<Vec<Value>>, SearchError> {
        let index = entity.index_name();
        let key = derive_key(index, &[("query", query)]);

        if let Some(hit) = self.cache_fetch::<Vec<Value>>(index, &key).await {
            return Ok(Some(hit));
        }

        let docs = self.search.search(index, query, page).await?;
        if docs.is_empty() {
            return Ok(None);
        }
        self.cache_store(&key, &docs).await;
        Ok(Some(docs))
    }

    async fn cache_fetch<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        let payload = match self.cache.get(key).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = %key, error = %err, "Cache read failed, falling back to index");
                crate::metrics::record_cache_miss(namespace);
                return None;
            }
        };

        match payload {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(decoded) => {
                    debug!(key = %key, "Cache hit");
                    crate::metrics::record_cache_hit(namespace);
                    Some(decoded)
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "Undecodable cache payload, treating as miss");
                    crate::metrics::record_cache_miss(namespace);
                    None
                }
            },
            None => {
                crate::metrics::record_cache_miss(namespace);
                None
            }
        }
    }

    async fn cache_store<T: Serialize>(&self, key: &str, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = %key, error = %err, "Unserializable cache payload, skipping write");
                return;
            }
        };
        if let Err(err) = self.cache.set(key, &payload, self.ttl).await {
            warn!(key = %key, error = %err, "Cache write failed, response served uncached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheProvider;
    use crate::entity::Document;
    use crate::search::MemorySearchProvider;
    use serde_json::json;

    struct Harness {
        search: Arc<MemorySearchProvider>,
        cache: Arc<MemoryCacheProvider>,
        service: ReadService,
    }

    fn harness() -> Harness {
        let search = Arc::new(MemorySearchProvider::new());
        let cache = Arc::new(MemoryCacheProvider::new());
        let service = ReadService::new(search.clone(), cache.clone(), Duration::from_secs(300));
        Harness { search, cache, service }
    }

    async fn seed_film(search: &MemorySearchProvider, id: &str, title: &str, rating: f64) {
        search
            .bulk(
                "movies",
                &[Document::new(
                    id,
                    json!({"id": id, "title": title, "imdb_rating": rating, "genre": ["Drama"]}),
                )],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_detail_miss_populates_cache() {
        let h = harness();
        seed_film(&h.search, "f-1", "First", 7.0).await;

        let doc = h.service.get_by_id(EntityKind::Films, "f-1").await.unwrap().unwrap();
        assert_eq!(doc["title"], "First");
        assert_eq!(h.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_detail_hit_skips_the_index() {
        let h = harness();
        seed_film(&h.search, "f-1", "First", 7.0).await;
        h.service.get_by_id(EntityKind::Films, "f-1").await.unwrap();

        // Replace the indexed document; the cached copy must still be served
        seed_film(&h.search, "f-1", "Renamed", 7.0).await;
        let doc = h.service.get_by_id(EntityKind::Films, "f-1").await.unwrap().unwrap();
        assert_eq!(doc["title"], "First");
    }

    #[tokio::test]
    async fn test_absent_document_is_none_and_not_cached() {
        let h = harness();

        assert!(h.service.get_by_id(EntityKind::Films, "f-1").await.unwrap().is_none());
        assert!(h.cache.is_empty());

        // Indexed afterwards: visible immediately, no negative entry in the way
        seed_film(&h.search, "f-1", "Late Arrival", 6.0).await;
        assert!(h.service.get_by_id(EntityKind::Films, "f-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_a_miss() {
        let h = harness();
        seed_film(&h.search, "f-1", "First", 7.0).await;
        h.cache.put_raw(&derive_key("movies", &[("id", "f-1")]), "{not json");

        let doc = h.service.get_by_id(EntityKind::Films, "f-1").await.unwrap().unwrap();
        assert_eq!(doc["title"], "First");
        // The repaired payload replaced the corrupt one
        let raw = h.cache.get(&derive_key("movies", &[("id", "f-1")])).await.unwrap().unwrap();
        assert!(serde_json::from_str::<Value>(&raw).is_ok());
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let h = harness();
        seed_film(&h.search, "f-1", "First", 7.0).await;
        h.service.get_by_id(EntityKind::Films, "f-1").await.unwrap();

        seed_film(&h.search, "f-1", "Renamed", 7.0).await;
        h.cache.expire_now(&derive_key("movies", &[("id", "f-1")]));

        let doc = h.service.get_by_id(EntityKind::Films, "f-1").await.unwrap().unwrap();
        assert_eq!(doc["title"], "Renamed");
    }

    #[tokio::test]
    async fn test_collection_key_covers_filter_and_sort() {
        let h = harness();
        seed_film(&h.search, "f-1", "First", 7.0).await;
        seed_film(&h.search, "f-2", "Second", 8.0).await;

        h.service
            .get_collection(EntityKind::Films, Some("imdb_rating"), Some(("genre", "Drama")), Page::default())
            .await
            .unwrap();
        h.service
            .get_collection(EntityKind::Films, Some("imdb_rating"), None, Page::default())
            .await
            .unwrap();

        // Distinct query shapes, distinct entries
        assert_eq!(h.cache.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_collection_is_none_and_not_cached() {
        let h = harness();
        seed_film(&h.search, "f-1", "First", 7.0).await;

        let result = h.service
            .get_collection(EntityKind::Films, None, Some(("genre", "Horror")), Page::default())
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(h.cache.is_empty());
    }

    #[tokio::test]
    async fn test_search_results_cached_per_query() {
        let h = harness();
        seed_film(&h.search, "f-1", "Star Chaser", 7.0).await;
        seed_film(&h.search, "f-2", "Quiet Fields", 8.0).await;

        let first = h.service
            .get_search(EntityKind::Films, "star", Page::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.len(), 1);

        // Second identical query is a hit
        let again = h.service
            .get_search(EntityKind::Films, "star", Page::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again, first);

        // Different query, different entry
        h.service.get_search(EntityKind::Films, "quiet", Page::default()).await.unwrap();
        assert_eq!(h.cache.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_search_is_none() {
        let h = harness();
        seed_film(&h.search, "f-1", "Star Chaser", 7.0).await;

        let result = h.service
            .get_search(EntityKind::Films, "zzz-nothing", Page::default())
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(h.cache.is_empty());
    }
}
