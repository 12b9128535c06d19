// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! End-to-end pipeline tests over the in-memory providers: source changes
//! flow through the sync orchestrator into the search index, and come back
//! out through the cache-aside read service and the HTTP API.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use cinesync::api::{self, AuthLayer};
use cinesync::cache::{derive_key, MemoryCacheProvider};
use cinesync::checkpoint::{CheckpointStore, MemoryCheckpointStore};
use cinesync::etl::memory::MemoryChangeSource;
use cinesync::{
    Config, EntityKind, IndexWriter, MemorySearchProvider, Page, ReadService, SearchProvider,
    SyncOrchestrator,
};

struct Pipeline {
    source: Arc<MemoryChangeSource>,
    checkpoints: Arc<MemoryCheckpointStore>,
    index: Arc<MemorySearchProvider>,
    cache: Arc<MemoryCacheProvider>,
    orchestrator: SyncOrchestrator,
    reads: Arc<ReadService>,
}

fn pipeline(config: Config) -> Pipeline {
    let source = Arc::new(MemoryChangeSource::new());
    let checkpoints = Arc::new(MemoryCheckpointStore::new());
    let index = Arc::new(MemorySearchProvider::new());
    let cache = Arc::new(MemoryCacheProvider::new());

    let orchestrator = SyncOrchestrator::new(
        checkpoints.clone(),
        source.clone(),
        source.clone(),
        IndexWriter::new(index.clone()),
        &config,
    );
    let reads = Arc::new(ReadService::new(
        index.clone(),
        cache.clone(),
        Duration::from_secs(config.cache_ttl_secs),
    ));

    Pipeline { source, checkpoints, index, cache, orchestrator, reads }
}

fn past(seconds_ago: i64) -> DateTime<Utc> {
    Utc::now() - ChronoDuration::seconds(seconds_ago)
}

fn film_body(id: &str, title: &str, rating: f64, genre: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": format!("About {}", title),
        "imdb_rating": rating,
        "genre": [genre],
        "director": [],
        "actors_names": [],
        "writers_names": [],
        "actors": [],
        "writers": [],
    })
}

#[tokio::test]
async fn test_source_changes_become_readable() {
    let p = pipeline(Config::default());
    let film_id = Uuid::new_v4().to_string();
    p.source.upsert(
        EntityKind::Films,
        &film_id,
        past(60),
        film_body(&film_id, "Star Chaser", 7.4, "Action"),
    );
    p.source.upsert(
        EntityKind::Persons,
        "p-1",
        past(60),
        json!({"id": "p-1", "full_name": "A. Smith"}),
    );

    let summary = p.orchestrator.sync_pass().await;
    assert_eq!(summary.documents_indexed, 2);
    assert_eq!(summary.failed_entities, 0);

    let film = p.reads.get_by_id(EntityKind::Films, &film_id).await.unwrap().unwrap();
    assert_eq!(film["title"], "Star Chaser");
    let person = p.reads.get_by_id(EntityKind::Persons, "p-1").await.unwrap().unwrap();
    assert_eq!(person["full_name"], "A. Smith");
}

#[tokio::test]
async fn test_quiet_source_means_quiet_index() {
    let p = pipeline(Config::default());
    p.source.upsert(EntityKind::Films, "f-1", past(60), film_body("f-1", "First", 7.0, "Drama"));

    p.orchestrator.sync_pass().await;
    let written = p.index.documents_written();

    // Two more passes with no source activity write nothing
    p.orchestrator.sync_pass().await;
    p.orchestrator.sync_pass().await;
    assert_eq!(p.index.documents_written(), written);
}

#[tokio::test]
async fn test_update_overwrites_indexed_document() {
    let p = pipeline(Config::default());
    p.source.upsert(EntityKind::Films, "f-1", past(60), film_body("f-1", "Working Title", 6.0, "Drama"));
    p.orchestrator.sync_pass().await;

    p.source.upsert(
        EntityKind::Films,
        "f-1",
        Utc::now() + ChronoDuration::seconds(1),
        film_body("f-1", "Final Title", 6.0, "Drama"),
    );
    p.orchestrator.sync_pass().await;

    assert_eq!(p.index.index_len("movies"), 1);
    let doc = p
        .index
        .get_all("movies", None, None, Page::default())
        .await
        .unwrap();
    assert_eq!(doc[0]["title"], "Final Title");
}

#[tokio::test]
async fn test_cached_read_is_stale_until_expiry() {
    let p = pipeline(Config::default());
    p.source.upsert(EntityKind::Films, "f-1", past(60), film_body("f-1", "Original", 6.0, "Drama"));
    p.orchestrator.sync_pass().await;

    // Prime the cache, then change and resync
    let first = p.reads.get_by_id(EntityKind::Films, "f-1").await.unwrap().unwrap();
    assert_eq!(first["title"], "Original");

    p.source.upsert(
        EntityKind::Films,
        "f-1",
        Utc::now() + ChronoDuration::seconds(1),
        film_body("f-1", "Renamed", 6.0, "Drama"),
    );
    p.orchestrator.sync_pass().await;

    // Within the TTL the cached copy wins
    let cached = p.reads.get_by_id(EntityKind::Films, "f-1").await.unwrap().unwrap();
    assert_eq!(cached["title"], "Original");

    // After expiry the reindexed document is visible
    p.cache.expire_now(&derive_key("movies", &[("id", "f-1")]));
    let fresh = p.reads.get_by_id(EntityKind::Films, "f-1").await.unwrap().unwrap();
    assert_eq!(fresh["title"], "Renamed");
}

#[tokio::test]
async fn test_checkpoints_survive_orchestrator_restart() {
    let config = Config::default();
    let p = pipeline(config.clone());
    p.source.upsert(EntityKind::Films, "f-1", past(60), film_body("f-1", "First", 7.0, "Drama"));
    p.orchestrator.sync_pass().await;
    let checkpoint = p.checkpoints.last_sync(EntityKind::Films).await.unwrap();

    // A new orchestrator over the same stores resumes from the checkpoint
    // instead of re-reading the world
    let restarted = SyncOrchestrator::new(
        p.checkpoints.clone(),
        p.source.clone(),
        p.source.clone(),
        IndexWriter::new(p.index.clone()),
        &config,
    );
    let written = p.index.documents_written();
    restarted.sync_pass().await;

    assert_eq!(p.index.documents_written(), written);
    assert!(p.checkpoints.last_sync(EntityKind::Films).await.unwrap() >= checkpoint);
}

#[tokio::test]
async fn test_http_round_trip() {
    let p = pipeline(Config::default());
    for (id, title, rating, genre) in [
        ("f-1", "Star Chaser", 7.4, "Action"),
        ("f-2", "Quiet Fields", 8.5, "Drama"),
        ("f-3", "Star Harbor", 6.2, "Action"),
    ] {
        p.source.upsert(EntityKind::Films, id, past(60), film_body(id, title, rating, genre));
    }
    p.orchestrator.sync_pass().await;

    let auth = Arc::new(AuthLayer::from_config(&Config::default()));
    let app = api::router(p.reads.clone(), auth);
    let claims = json!({"roles": ["subscriber"], "exp": Utc::now().timestamp() + 3600});
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"test"),
    )
    .unwrap();

    let get = |uri: &str| {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    // Detail: trimmed projection of the synced document
    let response = app.clone().oneshot(get("/api/v1/films/f-2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(
        body,
        json!({"id": "f-2", "title": "Quiet Fields", "description": "About Quiet Fields"})
    );

    // Listing filtered to Action, highest rating first
    let response = app
        .clone()
        .oneshot(get("/api/v1/films/?sort=imdb_rating&filter_name=genre&filter_arg=Action"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["f-1", "f-3"]);

    // Search hits only the matching title
    let response = app
        .clone()
        .oneshot(get("/api/v1/films/search/?query=quiet"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // No token, no data
    let bare = Request::builder()
        .uri("/api/v1/films/f-2")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(bare).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_partial_failure_recovers_without_data_loss() {
    let p = pipeline(Config::default());
    p.source.upsert(EntityKind::Films, "good", past(60), film_body("good", "Fine", 7.0, "Drama"));
    p.source.upsert(EntityKind::Films, "bad", past(60), film_body("bad", "Broken", 5.0, "Drama"));
    p.index.reject_id("bad");

    let summary = p.orchestrator.sync_pass().await;
    assert_eq!(summary.partial_failures, 1);
    assert_eq!(p.index.index_len("movies"), 1);

    // Index recovers; the held-back checkpoint replays the page
    p.index.clear_rejections();
    let summary = p.orchestrator.sync_pass().await;
    assert_eq!(summary.partial_failures, 0);
    assert_eq!(p.index.index_len("movies"), 2);
    let doc = p.reads.get_by_id(EntityKind::Films, "bad").await.unwrap().unwrap();
    assert_eq!(doc["title"], "Broken");
}
