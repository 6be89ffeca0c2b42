//! Fetch Task Module
//!
//! Cancellable handle for a single in-flight fetch.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::task::AbortHandle;
use tracing::debug;

// == Task Id ==
/// Opaque handle identifying one fetch issued by a [`Fetcher`](super::Fetcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch-{}", self.0)
    }
}

// == Task State ==
/// Lifecycle of a fetch. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
}

impl TaskState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TaskState::Pending,
            1 => TaskState::Running,
            2 => TaskState::Completed,
            _ => TaskState::Cancelled,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Cancelled)
    }
}

// == State Cell ==
/// Atomic state shared by the handle and the spawned fetch.
///
/// Completion and cancellation race through `transition`; exactly one wins.
#[derive(Debug, Default)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn load(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn start(&self) -> bool {
        self.transition(&[TaskState::Pending], TaskState::Running)
    }

    pub(crate) fn complete(&self) -> bool {
        self.transition(&[TaskState::Pending, TaskState::Running], TaskState::Completed)
    }

    pub(crate) fn cancel(&self) -> bool {
        self.transition(&[TaskState::Pending, TaskState::Running], TaskState::Cancelled)
    }

    fn transition(&self, from: &[TaskState], to: TaskState) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                from.contains(&TaskState::from_u8(raw)).then_some(to as u8)
            })
            .is_ok()
    }
}

// == Fetch Task ==
/// Handle returned by [`Fetcher::fetch`](super::Fetcher::fetch).
///
/// The fetch is already running when the handle is returned. Dropping the
/// handle does not stop it.
#[derive(Debug)]
pub struct FetchTask {
    id: TaskId,
    url: String,
    state: Arc<StateCell>,
    abort: AbortHandle,
}

impl FetchTask {
    pub(crate) fn new(id: TaskId, url: String, state: Arc<StateCell>, abort: AbortHandle) -> Self {
        Self {
            id,
            url,
            state,
            abort,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> TaskState {
        self.state.load()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    // == Cancel ==
    /// Stops the fetch if it has not completed yet.
    ///
    /// A cancelled fetch never invokes its completion. Returns false when the
    /// task had already completed or been cancelled, in which case nothing changes.
    pub fn cancel(&self) -> bool {
        if !self.state.cancel() {
            return false;
        }
        self.abort.abort();
        debug!(task = %self.id, url = %self.url, "fetch cancelled");
        true
    }
}
