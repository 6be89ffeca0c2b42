//! Expiring Cache Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL expiration.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{
    Blob, CacheEntry, CacheStats, Clock, LruTracker, SystemClock, DEFAULT_CAPACITY, DEFAULT_TTL,
    MAIN_CACHE_NAME,
};

/// Cache handle shared between the manager, fetch completions and the cleanup task.
pub type SharedCache = Arc<RwLock<ExpiringCache>>;

// == Cache Config ==
/// Construction-time settings of an [`ExpiringCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries kept at once
    pub max_capacity: usize,
    /// TTL applied by [`ExpiringCache::set`]
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_CAPACITY,
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl CacheConfig {
    pub fn with_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub fn with_ttl(mut self, default_ttl: Duration) -> Self {
        self.default_ttl = default_ttl;
        self
    }
}

// == Cached Blob ==
/// A fresh cache hit together with its version metadata.
#[derive(Debug, Clone)]
pub struct CachedBlob {
    pub bytes: Blob,
    pub generation: u64,
    pub expires_at: DateTime<Utc>,
}

// == Expiring Cache ==
/// In-memory blob cache with per-entry expiry and strict LRU eviction.
///
/// Both `set` and a successful `get` count as a use. Once an insertion
/// pushes the entry count past `max_capacity`, least recently used
/// entries are dropped until the cache fits again.
#[derive(Debug)]
pub struct ExpiringCache {
    name: String,
    config: CacheConfig,
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    stats: CacheStats,
    clock: Arc<dyn Clock>,
    next_generation: u64,
}

impl ExpiringCache {
    // == Constructor ==
    /// Creates a cache reading the system clock.
    pub fn new(name: impl Into<String>, config: CacheConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    /// Creates a cache with an injected clock.
    pub fn with_clock(name: impl Into<String>, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            config,
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            clock,
            next_generation: 1,
        }
    }

    // == Main Instance ==
    /// Process-wide default cache with the default configuration.
    ///
    /// Callers needing isolation should construct their own instance instead.
    pub fn main() -> SharedCache {
        static MAIN: OnceLock<SharedCache> = OnceLock::new();
        MAIN.get_or_init(|| ExpiringCache::new(MAIN_CACHE_NAME, CacheConfig::default()).shared())
            .clone()
    }

    /// Wraps the cache for sharing across tasks.
    pub fn shared(self) -> SharedCache {
        Arc::new(RwLock::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.config.max_capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // == Set ==
    /// Stores bytes under `key` with the default TTL.
    ///
    /// Returns the generation assigned to the new entry.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Blob>) -> u64 {
        let ttl = self.config.default_ttl;
        self.set_with_ttl(key, value, ttl)
    }

    /// Stores bytes under `key`, replacing any previous entry and resetting its expiry.
    pub fn set_with_ttl(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Blob>,
        ttl: Duration,
    ) -> u64 {
        let key = key.into();
        let generation = self.next_generation;
        self.next_generation += 1;

        let entry = CacheEntry::new(value.into(), self.clock.now(), ttl, generation);
        debug!(cache = %self.name, key = %key, size = entry.size(), generation, "stored entry");
        self.entries.insert(key.clone(), entry);
        self.lru.touch(&key);

        while self.entries.len() > self.config.max_capacity {
            let Some(evicted) = self.lru.evict_oldest() else {
                break;
            };
            self.entries.remove(&evicted);
            self.stats.record_eviction();
            debug!(cache = %self.name, key = %evicted, "evicted least recently used entry");
        }

        self.stats.set_total_entries(self.entries.len());
        generation
    }

    // == Get ==
    /// Returns the bytes stored under `key` if present and unexpired.
    ///
    /// Expired entries are removed on sight. A miss is a normal outcome.
    pub fn get(&mut self, key: &str) -> Option<Blob> {
        self.lookup(key).map(|hit| hit.bytes)
    }

    /// Like [`get`](Self::get), also reporting the entry's generation and expiry.
    pub fn lookup(&mut self, key: &str) -> Option<CachedBlob> {
        if !self.drop_if_expired(key) {
            if let Some(entry) = self.entries.get(key) {
                debug!(
                    cache = %self.name,
                    key,
                    ttl_remaining = ?entry.ttl_remaining_at(self.clock.now()),
                    "cache hit"
                );
                let hit = CachedBlob {
                    bytes: entry.value.clone(),
                    generation: entry.generation,
                    expires_at: entry.expires_at,
                };
                self.lru.touch(key);
                self.stats.record_hit();
                return Some(hit);
            }
        }
        self.stats.record_miss();
        None
    }

    // == Generation ==
    /// Generation of the fresh entry under `key`, without counting a use.
    pub fn generation_of(&mut self, key: &str) -> Option<u64> {
        if self.drop_if_expired(key) {
            return None;
        }
        self.entries.get(key).map(|entry| entry.generation)
    }

    // == Remove ==
    /// Removes an entry by key. Returns whether anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        self.stats.record_expirations(expired.len());
        self.stats.set_total_entries(self.entries.len());
        expired.len()
    }

    // == Stats ==
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

    /// Removes `key` if its entry has expired. Returns true when it did.
    fn drop_if_expired(&mut self, key: &str) -> bool {
        let now = self.clock.now();
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now));

        if expired {
            self.entries.remove(key);
            self.lru.remove(key);
            self.stats.record_expirations(1);
            self.stats.set_total_entries(self.entries.len());
            debug!(cache = %self.name, key, "dropped expired entry");
        }
        expired
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn store_with_clock(capacity: usize) -> (ExpiringCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = ExpiringCache::with_clock(
            "test",
            CacheConfig::default().with_capacity(capacity),
            clock.clone(),
        );
        (cache, clock)
    }

    #[test]
    fn test_cache_new() {
        let cache = ExpiringCache::new("images", CacheConfig::default());
        assert_eq!(cache.name(), "images");
        assert_eq!(cache.capacity(), 20);
        assert_eq!(cache.default_ttl(), Duration::from_secs(86_400));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_set_and_get() {
        let (mut cache, _) = store_with_clock(10);

        cache.set("/logo.png", b"png-bytes".to_vec());

        assert_eq!(cache.get("/logo.png").as_deref(), Some(&b"png-bytes"[..]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_get_missing_is_none() {
        let (mut cache, _) = store_with_clock(10);
        assert!(cache.get("/missing").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_cache_overwrite_bumps_generation() {
        let (mut cache, _) = store_with_clock(10);

        let first = cache.set("k", b"one".to_vec());
        let second = cache.set("k", b"two".to_vec());

        assert!(second > first);
        assert_eq!(cache.len(), 1);
        let hit = cache.lookup("k").unwrap();
        assert_eq!(&*hit.bytes, b"two");
        assert_eq!(hit.generation, second);
    }

    #[test]
    fn test_cache_expiry_removes_entry() {
        let (mut cache, clock) = store_with_clock(10);

        cache.set_with_ttl("k", b"v".to_vec(), Duration::from_secs(30));
        clock.advance(Duration::from_secs(29));
        assert!(cache.get("k").is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_cache_default_ttl_is_one_day() {
        let (mut cache, clock) = store_with_clock(10);
        let now = clock.now();

        cache.set("k", b"v".to_vec());

        let hit = cache.lookup("k").unwrap();
        assert_eq!(hit.expires_at - now, chrono::Duration::seconds(86_400));
    }

    #[test]
    fn test_cache_lru_eviction() {
        let (mut cache, _) = store_with_clock(3);

        cache.set("key1", b"1".to_vec());
        cache.set("key2", b"2".to_vec());
        cache.set("key3", b"3".to_vec());
        cache.set("key4", b"4".to_vec());

        assert_eq!(cache.len(), 3);
        assert!(cache.get("key1").is_none());
        assert!(cache.get("key2").is_some());
        assert!(cache.get("key3").is_some());
        assert!(cache.get("key4").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_cache_get_refreshes_recency() {
        let (mut cache, _) = store_with_clock(3);

        cache.set("key1", b"1".to_vec());
        cache.set("key2", b"2".to_vec());
        cache.set("key3", b"3".to_vec());
        cache.get("key1");
        cache.set("key4", b"4".to_vec());

        assert!(cache.get("key1").is_some());
        assert!(cache.get("key2").is_none());
    }

    #[test]
    fn test_cache_generation_of_does_not_touch() {
        let (mut cache, _) = store_with_clock(2);

        let generation = cache.set("key1", b"1".to_vec());
        cache.set("key2", b"2".to_vec());
        assert_eq!(cache.generation_of("key1"), Some(generation));

        cache.set("key3", b"3".to_vec());

        assert_eq!(cache.generation_of("key1"), None);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_cache_zero_capacity_stores_nothing() {
        let (mut cache, _) = store_with_clock(0);
        cache.set("k", b"v".to_vec());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_remove() {
        let (mut cache, _) = store_with_clock(10);

        cache.set("k", b"v".to_vec());
        assert!(cache.remove("k"));
        assert!(!cache.remove("k"));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_cache_purge_expired() {
        let (mut cache, clock) = store_with_clock(10);

        cache.set_with_ttl("short", b"1".to_vec(), Duration::from_secs(1));
        cache.set_with_ttl("long", b"2".to_vec(), Duration::from_secs(10));
        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("long").is_some());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test]
    async fn test_main_cache_is_shared() {
        let first = ExpiringCache::main();
        let second = ExpiringCache::main();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.read().await.name(), MAIN_CACHE_NAME);
    }
}
