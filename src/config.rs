//! Configuration Module
//!
//! Handles loading and managing asset cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Asset cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub cache_capacity: usize,
    /// TTL in seconds applied to every stored asset
    pub cache_ttl: u64,
    /// Per-fetch timeout in seconds
    pub fetch_timeout: u64,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 20)
    /// - `CACHE_TTL` - Entry TTL in seconds (default: 86400)
    /// - `FETCH_TIMEOUT` - Fetch timeout in seconds (default: 10)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.cache_capacity),
            cache_ttl: parse_var("CACHE_TTL").unwrap_or(defaults.cache_ttl),
            fetch_timeout: parse_var("FETCH_TIMEOUT").unwrap_or(defaults.fetch_timeout),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    pub fn cleanup_period(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: 20,
            cache_ttl: 86_400,
            fetch_timeout: 10,
            cleanup_interval: 60,
        }
    }
}
