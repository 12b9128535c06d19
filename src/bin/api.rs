// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Read API entrypoint: serves cached entity reads over the search index.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cinesync::api::{self, AuthLayer};
use cinesync::cache::RedisCacheProvider;
use cinesync::search::ElasticProvider;
use cinesync::{Config, ReadService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    let redis_url = config
        .redis_url
        .clone()
        .ok_or("CINESYNC_REDIS_URL is required")?;
    let elastic_url = config
        .elastic_url
        .clone()
        .ok_or("CINESYNC_ELASTIC_URL is required")?;

    let index = Arc::new(ElasticProvider::connect(&elastic_url).await?);
    let cache = Arc::new(RedisCacheProvider::new(&redis_url).await?);

    let reads = Arc::new(ReadService::new(
        index,
        cache,
        Duration::from_secs(config.cache_ttl_secs),
    ));
    let auth = Arc::new(AuthLayer::from_config(&config));
    let app = api::router(reads, auth);

    let listener = tokio::net::TcpListener::bind(&config.api_bind).await?;
    info!(bind = %config.api_bind, "Read API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl-C, draining connections");
        })
        .await?;
    Ok(())
}
