//! Task Registry
//!
//! Identifier-keyed table of live fetch tasks.

use std::collections::HashMap;

use tracing::debug;

use crate::fetch::{FetchTask, TaskId};

/// Caller-chosen key used to track and cancel a fetch.
pub type TaskIdentifier = u64;

/// Live tasks by identifier. At most one task per identifier.
#[derive(Debug, Default)]
pub(crate) struct TaskRegistry {
    tasks: HashMap<TaskIdentifier, FetchTask>,
}

impl TaskRegistry {
    /// Registers `task` under `identifier`.
    ///
    /// A task already live under the same identifier is cancelled and
    /// replaced; its completion never fires.
    pub(crate) fn register(&mut self, identifier: TaskIdentifier, task: FetchTask) {
        if let Some(previous) = self.tasks.insert(identifier, task) {
            previous.cancel();
            debug!(identifier, replaced = %previous.id(), "replaced live task");
        }
    }

    /// Removes the entry for `identifier` if it still belongs to `task_id`.
    ///
    /// Returns false when the task was cancelled or replaced meanwhile.
    pub(crate) fn finish(&mut self, identifier: TaskIdentifier, task_id: TaskId) -> bool {
        match self.tasks.get(&identifier) {
            Some(task) if task.id() == task_id => {
                self.tasks.remove(&identifier);
                true
            }
            _ => false,
        }
    }

    /// Cancels the task under `identifier` and removes it.
    ///
    /// Returns false when nothing is registered or the task already
    /// completed. A completed task stays registered so its result is still
    /// delivered.
    pub(crate) fn cancel(&mut self, identifier: TaskIdentifier) -> bool {
        let Some(task) = self.tasks.get(&identifier) else {
            return false;
        };
        if !task.cancel() {
            debug!(identifier, task = %task.id(), "task already completed, nothing to cancel");
            return false;
        }
        self.tasks.remove(&identifier);
        true
    }

    pub(crate) fn contains(&self, identifier: TaskIdentifier) -> bool {
        self.tasks.contains_key(&identifier)
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}
