//! Expiring memoization of query results.
//!
//! Dashboards poll the same aggregations every few seconds. [`ResultCache`]
//! remembers successful results by their full argument signature for a short
//! time-to-live. It sits outside the queries themselves: a cached answer is
//! always the value an uncached call returned earlier.
//!
//! Two concurrent misses for the same key may both compute; whichever stores
//! last wins, and both values are equal.

use std::hash::Hash;
use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use crate::error::Result;

/// Default time-to-live for cached results.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default maximum number of cached results.
pub const DEFAULT_CAPACITY: u64 = 1024;

/// Time-based memoization keyed by argument signature.
///
/// A zero TTL disables caching entirely.
pub struct ResultCache<K, V> {
    inner: Option<Cache<K, V>>,
    ttl: Duration,
}

impl<K, V> ResultCache<K, V>
where
    K: Hash + Eq + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let inner = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build()
        });
        Self { inner, ttl }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Return the cached value for `key`, or run `compute` and cache its result.
    ///
    /// Errors from `compute` are returned as-is and never cached.
    pub fn get_or_try_insert_with<F>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        let Some(cache) = &self.inner else {
            return compute();
        };

        if let Some(hit) = cache.get(&key) {
            debug!("Result cache hit: {:?}", key);
            return Ok(hit);
        }

        debug!("Result cache miss: {:?}", key);
        let value = compute()?;
        cache.insert(key, value.clone());
        Ok(value)
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.inner {
            cache.invalidate_all();
            cache.run_pending_tasks();
        }
    }

    /// Number of live entries.
    pub fn entry_count(&self) -> u64 {
        match &self.inner {
            Some(cache) => {
                cache.run_pending_tasks();
                cache.entry_count()
            }
            None => 0,
        }
    }
}
