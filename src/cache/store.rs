//! Cache Store Module
//!
//! The local cache an instance reads through. `CacheStore` is the seam the
//! service talks to; `MemoryCacheStore` is the in-process implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::cache::{CacheEntry, CacheStats, LruTracker};

// == Cache Store Trait ==
/// Storage operations the cache-aside service relies on.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the cached value, or None if absent or expired.
    async fn get(&self, key: &str) -> Option<String>;

    /// Like `get`, but leaves recency and counters untouched.
    async fn peek(&self, key: &str) -> Option<String>;

    /// Stores a value, replacing any existing entry for the key.
    async fn put(&self, key: &str, value: String);

    /// Stores a value only if `keep` still holds once the store is locked
    /// for writing. Returns whether the value was stored.
    async fn put_if(
        &self,
        key: &str,
        value: String,
        keep: &(dyn Fn() -> bool + Send + Sync),
    ) -> bool;

    /// Removes the entry for `key`. Returns whether one was present.
    async fn evict(&self, key: &str) -> bool;

    /// Removes every entry, returning how many were dropped.
    async fn clear(&self) -> usize;

    /// Removes expired entries, returning how many were dropped.
    async fn cleanup_expired(&self) -> usize;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn stats(&self) -> CacheStats;
}

// == Local Cache ==
/// Single-threaded cache core: entries, recency and counters.
#[derive(Debug)]
pub struct LocalCache {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    stats: CacheStats,
    /// Capacity bound, None = unbounded
    capacity: Option<usize>,
    /// Entry TTL in seconds, None = entries never expire
    ttl: Option<u64>,
}

impl LocalCache {
    /// Creates an empty cache with optional capacity bound and TTL.
    pub fn new(capacity: Option<usize>, ttl: Option<u64>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            capacity: capacity.filter(|cap| *cap > 0),
            ttl,
        }
    }

    /// Creates an unbounded cache whose entries never expire.
    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    // == Get ==
    /// Looks up a value. Expired entries are dropped and count as misses.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                let value = entry.value.clone();
                self.stats.record_hit();
                self.lru.touch(key);
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
        }
        self.stats.record_miss();
        None
    }

    // == Put ==
    /// Stores a value. A new key arriving at capacity evicts the least
    /// recently used entry first.
    pub fn put(&mut self, key: &str, value: String) {
        if let Some(capacity) = self.capacity {
            if !self.entries.contains_key(key) && self.entries.len() >= capacity {
                if let Some(coldest) = self.lru.evict_oldest() {
                    self.entries.remove(&coldest);
                    self.stats.record_eviction();
                }
            }
        }

        self.entries
            .insert(key.to_string(), CacheEntry::new(value, self.ttl));
        self.lru.touch(key);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Invalidate ==
    /// Drops the entry for `key`, if any.
    pub fn invalidate(&mut self, key: &str) -> bool {
        let removed = self.remove_entry(key).is_some();
        if removed {
            self.stats.record_invalidations(1);
        }
        removed
    }

    /// Drops every entry.
    pub fn invalidate_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.stats.record_invalidations(count);
        self.stats.set_total_entries(0);
        count
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Utc::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }
        self.stats.record_expirations(expired.len());
        expired.len()
    }

    /// Returns the entry for `key` without touching recency or counters.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.stats.set_total_entries(self.entries.len());
        Some(entry)
    }
}

// == Memory Cache Store ==
/// `CacheStore` backed by a `LocalCache` behind an async RwLock.
#[derive(Debug)]
pub struct MemoryCacheStore {
    name: String,
    inner: RwLock<LocalCache>,
}

impl MemoryCacheStore {
    pub fn new(name: impl Into<String>, cache: LocalCache) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(cache),
        }
    }

    /// Name of the cache, as configured.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        // Write lock: lookups update recency and counters
        self.inner.write().await.get(key)
    }

    async fn peek(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .await
            .peek(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    async fn put(&self, key: &str, value: String) {
        self.inner.write().await.put(key, value);
    }

    async fn put_if(
        &self,
        key: &str,
        value: String,
        keep: &(dyn Fn() -> bool + Send + Sync),
    ) -> bool {
        let mut cache = self.inner.write().await;
        if !keep() {
            return false;
        }
        cache.put(key, value);
        true
    }

    async fn evict(&self, key: &str) -> bool {
        let mut cache = self.inner.write().await;
        if let Some(entry) = cache.peek(key) {
            tracing::debug!(cache = %self.name, key, age_ms = entry.age_ms(), "Evicting entry");
        }
        cache.invalidate(key)
    }

    async fn clear(&self) -> usize {
        self.inner.write().await.invalidate_all()
    }

    async fn cleanup_expired(&self) -> usize {
        self.inner.write().await.cleanup_expired()
    }

    async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats()
    }
}
