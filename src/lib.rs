// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # CineSync
//!
//! Keeps a full-text film catalog in sync with its relational system of
//! record, and serves cached reads over it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Postgres (truth)                       │
//! │  • film_work / genre / person + link tables                │
//! │  • updated_at drives change detection                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              (poll loop: extract → build → bulk)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Elasticsearch (search index)                │
//! │  • one index per entity type (movies, genres, persons)     │
//! │  • denormalized documents, upsert by id                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                   (cache-aside read path)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Redis + HTTP read API                      │
//! │  • canonical cache keys, uniform TTL                       │
//! │  • bearer-token boundary, JSON:API-ish pagination          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Redis also holds the per-entity sync checkpoints, so a restarted daemon
//! resumes from where it left off instead of re-reading the world.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cinesync::{Config, IndexWriter, MemoryCacheProvider, MemorySearchProvider,
//!                ReadService, SyncOrchestrator};
//! use cinesync::checkpoint::MemoryCheckpointStore;
//! use cinesync::etl::memory::MemoryChangeSource;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let source = Arc::new(MemoryChangeSource::new());
//!     let index = Arc::new(MemorySearchProvider::new());
//!
//!     let orchestrator = SyncOrchestrator::new(
//!         Arc::new(MemoryCheckpointStore::new()),
//!         source.clone(),
//!         source,
//!         IndexWriter::new(index.clone()),
//!         &config,
//!     );
//!
//!     let reads = ReadService::new(
//!         index,
//!         Arc::new(MemoryCacheProvider::new()),
//!         Duration::from_secs(config.cache_ttl_secs),
//!     );
//!
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     orchestrator.run(shutdown_rx).await;
//!     drop(reads);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`etl`]: change extraction, document building, index writing and the
//!   [`SyncOrchestrator`] poll loop
//! - [`checkpoint`]: per-entity sync checkpoints in Redis
//! - [`search`]: search engine abstraction (Elasticsearch + in-memory double)
//! - [`cache`]: cache provider abstraction and canonical key derivation
//! - [`read`]: cache-aside [`ReadService`]
//! - [`api`]: axum router and bearer-token middleware
//! - [`resilience`]: jittered exponential retry

pub mod api;
pub mod cache;
pub mod checkpoint;
pub mod config;
pub mod entity;
pub mod etl;
pub mod metrics;
pub mod read;
pub mod resilience;
pub mod search;

pub use api::AuthLayer;
pub use cache::{derive_key, CacheProvider, MemoryCacheProvider, RedisCacheProvider};
pub use checkpoint::{CheckpointStore, RedisCheckpointStore};
pub use config::Config;
pub use entity::{Document, EntityKind};
pub use etl::{
    BulkOutcome, ChangeExtractor, DocumentBuilder, IndexWriter, PassSummary, PgChangeSource,
    SyncError, SyncOrchestrator, SyncState,
};
pub use read::ReadService;
pub use resilience::{retry, RetryConfig};
pub use search::{
    BulkReport, ElasticProvider, MemorySearchProvider, Page, SearchError, SearchProvider,
};
