//! Asset Cache - fetch, cache and decode remote assets
//!
//! Returns cached blobs when fresh, fetches them otherwise, decodes them into
//! typed values and pages through decoded collections.

pub mod cache;
pub mod config;
pub mod cursor;
pub mod decode;
pub mod delivery;
pub mod error;
pub mod fetch;
pub mod manager;
pub mod tasks;

pub use cache::{CacheConfig, ExpiringCache, SharedCache};
pub use config::Config;
pub use cursor::{Cursor, Page};
pub use error::{AssetError, NetworkError, Result};
pub use fetch::{Fetcher, HttpTransport, MemoryTransport, Transport};
pub use manager::{AssetManager, TaskIdentifier};
pub use tasks::spawn_cleanup_task;
