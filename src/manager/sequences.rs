//! Retained Sequences
//!
//! Decoded, ordered sequences kept per fetch key so later pages can be cut
//! without fetching or decoding again.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::LruTracker;

struct Retained {
    /// Cache generation of the bytes the items were decoded from
    generation: u64,
    items: Arc<dyn Any + Send + Sync>,
}

/// Generation-tagged decoded sequences, bounded by LRU.
///
/// An entry is only served while the byte cache still holds the same
/// generation for its key.
pub(crate) struct SequenceCache {
    entries: HashMap<String, Retained>,
    lru: LruTracker,
    limit: usize,
}

impl SequenceCache {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            limit,
        }
    }

    /// Returns the sequence retained for `key` if it was decoded from `generation`.
    ///
    /// Stale entries are dropped. A sequence of another element type counts as absent.
    pub(crate) fn get<T>(&mut self, key: &str, generation: u64) -> Option<Arc<Vec<T>>>
    where
        T: Send + Sync + 'static,
    {
        let retained = self.entries.get(key)?;
        if retained.generation != generation {
            self.remove(key);
            return None;
        }
        let items = Arc::clone(&retained.items).downcast::<Vec<T>>().ok()?;
        self.lru.touch(key);
        Some(items)
    }

    /// Retains `items` for `key`, replacing whatever was there.
    pub(crate) fn retain<T>(&mut self, key: &str, generation: u64, items: Arc<Vec<T>>)
    where
        T: Send + Sync + 'static,
    {
        self.entries
            .insert(key.to_string(), Retained { generation, items });
        self.lru.touch(key);

        while self.entries.len() > self.limit {
            let Some(oldest) = self.lru.evict_oldest() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    pub(crate) fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.lru.remove(key);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
