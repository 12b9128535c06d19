// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry logic with jittered exponential backoff.
//!
//! Every external call (Postgres, Redis, Elasticsearch) goes through
//! [`retry`], so transient network failures never bubble up on the first
//! blip. Different presets are available for different use cases.
//!
//! # Example
//!
//! ```
//! use cinesync::RetryConfig;
//!
//! // Startup: fail fast on bad config
//! let startup = RetryConfig::startup();
//! assert_eq!(startup.max_tries, Some(5));
//!
//! // Sync pass: patient retry, then skip the entity for this pass
//! let pass = RetryConfig::pass();
//! assert_eq!(pass.max_tries, Some(10));
//!
//! // Query: quick retry, then fail
//! let query = RetryConfig::query();
//! assert_eq!(query.max_tries, Some(3));
//! ```

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Configuration for connection/operation retry behavior.
///
/// The delay before attempt `n` (0-based) is
/// `min(max_delay, uniform(base_delay, base_delay * factor) * factor^n)` —
/// exponential growth with a uniformly jittered base so concurrent callers
/// do not retry in lockstep.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    /// Give up after this many failed attempts; `None` retries forever.
    pub max_tries: Option<usize>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::pass()
    }
}

impl RetryConfig {
    /// Fast-fail retry for initial startup connections.
    /// Use this when connecting at daemon startup to detect configuration
    /// errors quickly.
    #[must_use]
    pub fn startup() -> Self {
        Self {
            max_tries: Some(5),
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
        }
    }

    /// Patient retry for sync-pass work. If this budget is exhausted the
    /// orchestrator skips the entity for the current pass and tries again
    /// next interval.
    #[must_use]
    pub fn pass() -> Self {
        Self {
            max_tries: Some(10),
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
        }
    }

    /// Quick retry for individual read queries (don't block the request).
    #[must_use]
    pub fn query() -> Self {
        Self {
            max_tries: Some(3),
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
        }
    }

    /// Fast retry for tests (minimal delays)
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_tries: Some(3),
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
        }
    }

    /// Compute the backoff delay before retrying attempt `attempt` (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_secs_f64();
        let jittered = rand::thread_rng().gen_range(base..=base * self.factor);
        let delay = jittered * self.factor.powi(attempt as i32);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Lower/upper bounds of [`delay_for`](Self::delay_for) for a given
    /// attempt, before and after the `max_delay` clamp.
    #[must_use]
    pub fn delay_bounds(&self, attempt: u32) -> (Duration, Duration) {
        let base = self.base_delay.as_secs_f64();
        let growth = self.factor.powi(attempt as i32);
        let max = self.max_delay.as_secs_f64();
        (
            Duration::from_secs_f64((base * growth).min(max)),
            Duration::from_secs_f64((base * self.factor * growth).min(max)),
        )
    }
}

/// Run `operation` until it succeeds or the retry budget is exhausted.
///
/// After `max_tries` consecutive failures the final error is returned to the
/// caller rather than swallowed, so a degraded backend is visible at the
/// call site.
pub async fn retry<F, Fut, T, E>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if attempt > 0 {
                    info!("Operation '{}' succeeded after {} retries", operation_name, attempt);
                }
                return Ok(val);
            }
            Err(err) => {
                let tries = attempt as usize + 1;
                if let Some(max) = config.max_tries {
                    if tries >= max {
                        warn!(
                            "Operation '{}' failed (attempt {}/{}), giving up: {}",
                            operation_name, tries, max, err
                        );
                        return Err(err);
                    }
                }

                let delay = config.delay_for(attempt);
                warn!(
                    "Operation '{}' failed (attempt {}): {}. Retrying in {:?}...",
                    operation_name, tries, err, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
