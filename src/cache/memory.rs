//! In-memory cache provider for deterministic tests.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::{CacheError, CacheProvider};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// TTL-aware in-memory cache double. Expired entries are dropped lazily on
/// read.
#[derive(Default)]
pub struct MemoryCacheProvider {
    entries: DashMap<String, Entry>,
}

impl MemoryCacheProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current live entry count (expired entries may still be counted until
    /// their next read).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrite a key with an already-expired entry. Test hook for
    /// exercising TTL expiry without sleeping.
    pub fn expire_now(&self, key: &str) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.expires_at = Instant::now() - Duration::from_secs(1);
        }
    }

    /// Test hook: store a raw (possibly corrupt) payload.
    pub fn put_raw(&self, key: &str, value: &str) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(3600),
            },
        );
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
            drop(entry);
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}
