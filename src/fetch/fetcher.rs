//! Fetcher Module
//!
//! Dispatches fetches onto the Tokio runtime and hands back cancellable tasks.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::Blob;
use crate::error::{log_failure, NetworkError};
use crate::fetch::{FetchTask, StateCell, TaskId, Transport, DEFAULT_TIMEOUT};

/// Result handed to a fetch completion.
pub type FetchResult = std::result::Result<Blob, NetworkError>;

// == Fetcher ==
/// Issues fetches through a [`Transport`] with a bounded wait.
///
/// Cloning shares the transport and the task id sequence.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    next_id: Arc<AtomicU64>,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // == Fetch ==
    /// Starts fetching `url` and returns its task handle.
    ///
    /// `on_complete` runs exactly once with the bytes or a [`NetworkError`],
    /// unless the task is cancelled first, in which case it never runs.
    /// Must be called from within a Tokio runtime.
    pub fn fetch<F>(&self, url: &str, on_complete: F) -> FetchTask
    where
        F: FnOnce(FetchResult) + Send + 'static,
    {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let state = Arc::new(StateCell::default());
        let transport = Arc::clone(&self.transport);
        let timeout = self.timeout;

        let task_state = Arc::clone(&state);
        let task_url = url.to_string();
        let handle = tokio::spawn(async move {
            if !task_state.start() {
                return;
            }
            debug!(task = %id, url = %task_url, "fetch started");

            let result = match tokio::time::timeout(timeout, transport.get(&task_url, timeout)).await
            {
                Ok(result) => result,
                Err(_) => Err(NetworkError::Timeout(timeout)),
            };

            if !task_state.complete() {
                debug!(task = %id, "discarding result of cancelled fetch");
                return;
            }
            if let Err(err) = &result {
                log_failure(err, "Fetcher::fetch");
            }
            on_complete(result);
        });

        FetchTask::new(id, url.to_string(), state, handle.abort_handle())
    }
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{MemoryTransport, TaskState};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    fn fetcher(transport: MemoryTransport) -> Fetcher {
        Fetcher::new(Arc::new(transport))
    }

    #[tokio::test]
    async fn test_fetch_delivers_bytes() {
        let fetcher = fetcher(MemoryTransport::new().with_body("/a", b"bytes".to_vec()));
        let (tx, rx) = oneshot::channel();

        let task = fetcher.fetch("/a", move |result| {
            let _ = tx.send(result);
        });

        let bytes = rx.await.unwrap().unwrap();
        assert_eq!(&*bytes, b"bytes");
        assert_eq!(task.url(), "/a");
        assert_eq!(task.state(), TaskState::Completed);
        assert!(task.is_finished());
    }

    #[tokio::test]
    async fn test_fetch_delivers_error() {
        let fetcher = fetcher(MemoryTransport::new().with_status("/a", 500));
        let (tx, rx) = oneshot::channel();

        fetcher.fetch("/a", move |result| {
            let _ = tx.send(result);
        });

        assert!(matches!(rx.await.unwrap(), Err(NetworkError::Status(500))));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let transport = MemoryTransport::new().with_delayed_body(
            "/slow",
            b"late".to_vec(),
            Duration::from_secs(5),
        );
        let fetcher = fetcher(transport).with_timeout(Duration::from_millis(50));
        let (tx, rx) = oneshot::channel();

        fetcher.fetch("/slow", move |result| {
            let _ = tx.send(result);
        });

        match rx.await.unwrap() {
            Err(NetworkError::Timeout(after)) => assert_eq!(after, Duration::from_millis(50)),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_suppresses_completion() {
        let transport = MemoryTransport::new().with_delayed_body(
            "/slow",
            b"late".to_vec(),
            Duration::from_millis(200),
        );
        let fetcher = fetcher(transport);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let task = fetcher.fetch("/slow", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(task.cancel());
        assert_eq!(task.state(), TaskState::Cancelled);
        assert!(!task.cancel());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let fetcher = fetcher(MemoryTransport::new().with_body("/a", b"a".to_vec()));
        let (tx, rx) = oneshot::channel();

        let task = fetcher.fetch("/a", move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap().unwrap();

        assert!(!task.cancel());
        assert_eq!(task.state(), TaskState::Completed);
    }

    #[tokio::test]
    async fn test_task_ids_are_unique() {
        let fetcher = fetcher(MemoryTransport::new());
        let first = fetcher.fetch("/a", |_| {});
        let second = fetcher.clone().fetch("/b", |_| {});
        assert_ne!(first.id(), second.id());
    }
}
