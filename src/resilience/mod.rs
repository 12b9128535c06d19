//! Failure-handling building blocks.
//!
//! Every external call (Postgres, Redis, Elasticsearch) is wrapped in
//! [`retry::retry`] with a [`retry::RetryConfig`] chosen at the call site.

pub mod retry;

pub use retry::{retry, RetryConfig};
