//! Fetch Module
//!
//! Network side of the asset pipeline: transports, the fetch dispatcher and
//! cancellable task handles.

mod fetcher;
mod task;
mod transport;

use std::time::Duration;

pub use fetcher::{FetchResult, Fetcher};
pub use task::{FetchTask, TaskId, TaskState};
pub use transport::{HttpTransport, MemoryTransport, Transport};

pub(crate) use task::StateCell;

/// Default upper bound on a single fetch
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
