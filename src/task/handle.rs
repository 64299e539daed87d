//! The [`Task`] observation trait and the plain [`TaskHandle`].

use super::core::TaskCore;
use crate::types::{CancelledState, ExecutionState, Owner, TaskId};
use std::sync::Arc;

/// A scheduled unit of work with an observable lifecycle.
pub trait Task: Send + Sync {
    /// Diagnostic identifier.
    fn id(&self) -> TaskId;

    /// The submitter owning the task.
    fn owner(&self) -> &Owner;

    /// Whether the task fires more than once.
    fn is_repeating(&self) -> bool;

    /// Whether the task runs on an async worker rather than a tick context.
    fn is_async(&self) -> bool;

    /// Requests cancellation. See [`TaskCore::cancel`].
    fn cancel(&self) -> CancelledState;

    /// The current lifecycle state.
    fn execution_state(&self) -> ExecutionState;

    /// True for `Cancelled` and `CancelledRunning`.
    fn is_cancelled(&self) -> bool {
        self.execution_state().is_cancelled()
    }
}

/// A handle to a task without a result, typically a repeating one.
///
/// Cloning the handle shares the task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    core: Arc<TaskCore>,
}

impl TaskHandle {
    pub(crate) fn new(core: TaskCore) -> Self {
        Self {
            core: Arc::new(core),
        }
    }

    pub(crate) fn core(&self) -> &TaskCore {
        &self.core
    }

    /// Returns true if both handles refer to the same task.
    #[must_use]
    pub fn same_task(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl Task for TaskHandle {
    fn id(&self) -> TaskId {
        self.core.id()
    }

    fn owner(&self) -> &Owner {
        self.core.owner()
    }

    fn is_repeating(&self) -> bool {
        self.core.is_repeating()
    }

    fn is_async(&self) -> bool {
        self.core.is_async()
    }

    fn cancel(&self) -> CancelledState {
        self.core.cancel()
    }

    fn execution_state(&self) -> ExecutionState {
        self.core.execution_state()
    }
}
