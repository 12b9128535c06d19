// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding binary is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `cinesync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `index`: movies, genres, persons
//! - `namespace`: cache key namespace

use metrics::{counter, gauge, histogram};
use std::time::Duration;

use crate::etl::PassSummary;

/// Record documents accepted by the search index.
pub fn record_documents_indexed(index: &str, count: usize) {
    counter!(
        "cinesync_documents_indexed_total",
        "index" => index.to_string()
    )
    .increment(count as u64);
}

/// Record bulk items rejected by the search index.
pub fn record_bulk_failures(index: &str, count: usize) {
    counter!(
        "cinesync_bulk_failures_total",
        "index" => index.to_string()
    )
    .increment(count as u64);
}

/// Record an entity skipped for a pass after retry exhaustion.
pub fn record_entity_failure(index: &str) {
    counter!(
        "cinesync_entity_failures_total",
        "index" => index.to_string()
    )
    .increment(1);
}

/// Record a completed sync pass.
pub fn record_pass(summary: &PassSummary, elapsed: Duration) {
    counter!("cinesync_passes_total").increment(1);
    histogram!("cinesync_pass_seconds").record(elapsed.as_secs_f64());
    gauge!("cinesync_last_pass_documents").set(summary.documents_indexed as f64);
}

/// Record a cache hit for a key namespace.
pub fn record_cache_hit(namespace: &str) {
    counter!(
        "cinesync_cache_requests_total",
        "namespace" => namespace.to_string(),
        "outcome" => "hit"
    )
    .increment(1);
}

/// Record a cache miss (absent, expired, or undecodable payload).
pub fn record_cache_miss(namespace: &str) {
    counter!(
        "cinesync_cache_requests_total",
        "namespace" => namespace.to_string(),
        "outcome" => "miss"
    )
    .increment(1);
}

/// Record a rejected API request (missing or invalid bearer token).
pub fn record_auth_rejection() {
    counter!("cinesync_auth_rejections_total").increment(1);
}
