//! Memoization of whole-table computations keyed by their input parameters.
//!
//! Entries expire after a fixed window and the cache holds a bounded number
//! of them, evicting the oldest first. Values are shared through [`Arc`], so
//! a hit never copies a table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Expiration window and size bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    /// Zero disables caching.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            capacity: 8,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Entry<V> {
    value: Arc<V>,
    inserted: Instant,
}

/// In-memory TTL cache for generated or loaded tables.
pub struct TableCache<V> {
    config: CacheConfig,
    entries: FxHashMap<String, Entry<V>>,
    stats: CacheStats,
}

impl<V> TableCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: FxHashMap::default(),
            stats: CacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// A failed computation is not cached.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &str,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        self.get_or_try_insert_at(key, Instant::now(), compute)
    }

    fn get_or_try_insert_at<E>(
        &mut self,
        key: &str,
        now: Instant,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        self.purge_expired(now);

        if let Some(entry) = self.entries.get(key) {
            self.stats.hits += 1;
            debug!(key, "cache hit");
            return Ok(Arc::clone(&entry.value));
        }

        self.stats.misses += 1;
        debug!(key, "cache miss");
        let value = Arc::new(compute()?);
        if self.config.capacity == 0 {
            return Ok(value);
        }

        while self.entries.len() >= self.config.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    self.stats.evictions += 1;
                }
                None => break,
            }
        }

        self.entries.insert(
            key.to_string(),
            Entry {
                value: Arc::clone(&value),
                inserted: now,
            },
        );
        Ok(value)
    }

    fn purge_expired(&mut self, now: Instant) {
        let ttl = self.config.ttl();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.inserted) < ttl);
        self.stats.evictions += (before - self.entries.len()) as u64;
    }
}
