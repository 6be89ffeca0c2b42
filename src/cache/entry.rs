//! Cache Entry Module
//!
//! Defines the structure for individual cached blobs with expiry support.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::clock::saturating_add;

/// Raw bytes of a fetched asset. Cloning shares the allocation.
pub type Blob = Arc<[u8]>;

// == Cache Entry ==
/// Represents a single cached blob with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored bytes
    pub value: Blob,
    /// When the entry was stored
    pub created_at: DateTime<Utc>,
    /// When the entry stops being served
    pub expires_at: DateTime<Utc>,
    /// Version assigned by the owning cache on store
    pub generation: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` after `now`.
    pub fn new(value: Blob, now: DateTime<Utc>, ttl: Duration, generation: u64) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: saturating_add(now, ttl),
            generation,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of `now`.
    ///
    /// An entry is only served while `expires_at > now`, so the boundary
    /// instant itself already counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining lifetime as of `now`, zero once expired.
    pub fn ttl_remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Size of the stored payload in bytes.
    pub fn size(&self) -> usize {
        self.value.len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn blob(bytes: &[u8]) -> Blob {
        Arc::from(bytes)
    }

    #[test]
    fn test_entry_creation() {
        let now = Utc::now();
        let entry = CacheEntry::new(blob(b"payload"), now, Duration::from_secs(60), 7);

        assert_eq!(&*entry.value, b"payload");
        assert_eq!(entry.size(), 7);
        assert_eq!(entry.generation, 7);
        assert_eq!(entry.expires_at - entry.created_at, chrono::Duration::seconds(60));
        assert!(!entry.is_expired_at(now));
    }

    #[test]
    fn test_entry_expiration() {
        let now = Utc::now();
        let entry = CacheEntry::new(blob(b"v"), now, Duration::from_secs(1), 0);

        assert!(!entry.is_expired_at(now + chrono::Duration::milliseconds(999)));
        assert!(entry.is_expired_at(now + chrono::Duration::seconds(2)));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Utc::now();
        let entry = CacheEntry::new(blob(b"v"), now, Duration::from_secs(10), 0);

        // Entry should be expired when current time == expires_at
        assert!(entry.is_expired_at(entry.expires_at));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let now = Utc::now();
        let entry = CacheEntry::new(blob(b"v"), now, Duration::ZERO, 0);
        assert!(entry.is_expired_at(now));
    }

    #[test]
    fn test_ttl_remaining() {
        let now = Utc::now();
        let entry = CacheEntry::new(blob(b"v"), now, Duration::from_secs(10), 0);

        assert_eq!(entry.ttl_remaining_at(now), Duration::from_secs(10));
        assert_eq!(
            entry.ttl_remaining_at(now + chrono::Duration::seconds(4)),
            Duration::from_secs(6)
        );
        assert_eq!(
            entry.ttl_remaining_at(now + chrono::Duration::seconds(30)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let now = Utc::now();
        let entry = CacheEntry::new(blob(b"v"), now, Duration::from_secs(10_000_000_000_000), 0);

        assert_eq!(entry.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(!entry.is_expired_at(now + chrono::Duration::days(365 * 1000)));
    }
}
