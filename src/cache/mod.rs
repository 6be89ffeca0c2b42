//! Cache Module
//!
//! Provides in-memory blob caching with TTL expiration and LRU eviction.

mod clock;
mod entry;
mod lru;
mod stats;
mod store;


use std::time::Duration;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{Blob, CacheEntry};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{CacheConfig, CachedBlob, ExpiringCache, SharedCache};

// == Public Constants ==
/// Default maximum number of cached entries
pub const DEFAULT_CAPACITY: usize = 20;

/// Default lifetime of a cached asset (one day)
pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

/// Name of the process-wide default cache
pub const MAIN_CACHE_NAME: &str = "mainCache";
