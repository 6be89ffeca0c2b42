//! Recency ordering for cache keys.
//!
//! Both the byte cache and the retained-sequence cache evict through this.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Orders keys from least to most recently used.
///
/// Every touch stamps the key with a fresh tick. The smallest tick in
/// `order` is the least recently used key.
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Latest tick per key
    ticks: HashMap<String, u64>,
    /// Keys by tick, oldest first
    order: BTreeMap<u64, String>,
    next_tick: u64,
}

impl LruTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if new.
    pub fn touch(&mut self, key: &str) {
        let tick = self.next_tick;
        self.next_tick += 1;

        if let Some(previous) = self.ticks.insert(key.to_string(), tick) {
            self.order.remove(&previous);
        }
        self.order.insert(tick, key.to_string());
    }

    /// Forgets `key`. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) {
        if let Some(tick) = self.ticks.remove(key) {
            self.order.remove(&tick);
        }
    }

    // == Eviction ==
    /// Pops the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }
}
