// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync daemon entrypoint: polls Postgres and keeps the search index fresh.

use std::error::Error;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cinesync::checkpoint::RedisCheckpointStore;
use cinesync::etl::{IndexWriter, PgChangeSource, SyncOrchestrator};
use cinesync::search::ElasticProvider;
use cinesync::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    let postgres_url = config
        .postgres_url
        .clone()
        .ok_or("CINESYNC_POSTGRES_URL is required")?;
    let redis_url = config
        .redis_url
        .clone()
        .ok_or("CINESYNC_REDIS_URL is required")?;
    let elastic_url = config
        .elastic_url
        .clone()
        .ok_or("CINESYNC_ELASTIC_URL is required")?;

    let source = Arc::new(PgChangeSource::connect(&postgres_url).await?);
    let checkpoints = Arc::new(RedisCheckpointStore::new(&redis_url, &config.checkpoint_prefix).await?);
    let index = Arc::new(ElasticProvider::connect(&elastic_url).await?);
    info!("Connected to Postgres, Redis and the search index");

    let orchestrator = SyncOrchestrator::new(
        checkpoints,
        source.clone(),
        source,
        IndexWriter::new(index),
        &config,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down after the current pass");
            let _ = shutdown_tx.send(true);
        }
    });

    orchestrator.run(shutdown_rx).await;
    Ok(())
}
