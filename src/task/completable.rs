//! Tasks that produce a value.

use super::core::TaskCore;
use super::deferred::Deferred;
use super::handle::Task;
use crate::error::TaskError;
use crate::types::{CancelledState, ExecutionState, Owner, TaskId};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// A one-shot task whose outcome is observable through a [`Deferred`].
///
/// "The work ran" and "the caller got the value" are decoupled: the body's
/// return value, its panic, or the task's cancellation all end up in
/// [`result`](Self::result), exactly once.
pub struct CompletableTask<T> {
    core: Arc<TaskCore>,
    result: Deferred<T>,
}

impl<T> Clone for CompletableTask<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            result: self.result.clone(),
        }
    }
}

impl<T> CompletableTask<T> {
    pub(crate) fn new(owner: Owner, is_async: bool) -> Self {
        Self {
            core: Arc::new(TaskCore::new(owner, false, is_async)),
            result: Deferred::new(),
        }
    }

    pub(crate) fn core(&self) -> &TaskCore {
        &self.core
    }

    /// The deferred result.
    #[must_use]
    pub fn result(&self) -> &Deferred<T> {
        &self.result
    }

    /// Fires the task with `function`, which receives the task itself.
    ///
    /// Skipped if the task was cancelled. If the result is already resolved
    /// the body is not evaluated. A panic in `function` resolves the result
    /// exceptionally instead of propagating.
    pub fn complete<F>(&self, function: F)
    where
        F: FnOnce(&Self) -> T,
    {
        self.core.run(|| {
            if self.result.is_done() {
                return;
            }
            match catch_unwind(AssertUnwindSafe(|| function(self))) {
                Ok(value) => {
                    self.result.complete(value);
                }
                Err(payload) => {
                    self.result.fail(TaskError::from_panic(payload.as_ref()));
                }
            }
        });
    }

    /// Cancels on behalf of the host when the bound entity is gone.
    ///
    /// Returns `true` if the task was idle and is now cancelled.
    pub(crate) fn retire(&self) -> bool {
        if self.core.retire() {
            self.result.cancel();
            true
        } else {
            false
        }
    }

    /// Returns true if both handles refer to the same task.
    #[must_use]
    pub fn same_task(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl<T: Send> Task for CompletableTask<T> {
    fn id(&self) -> TaskId {
        self.core.id()
    }

    fn owner(&self) -> &Owner {
        self.core.owner()
    }

    fn is_repeating(&self) -> bool {
        false
    }

    fn is_async(&self) -> bool {
        self.core.is_async()
    }

    /// Cancels the task; if it will never run, the result resolves as
    /// cancelled so awaiting callers are released.
    fn cancel(&self) -> CancelledState {
        let outcome = self.core.cancel();
        if matches!(
            outcome,
            CancelledState::CancelledByCaller | CancelledState::CancelledAlready
        ) {
            self.result.cancel();
        }
        outcome
    }

    fn execution_state(&self) -> ExecutionState {
        self.core.execution_state()
    }
}

impl<T> std::fmt::Debug for CompletableTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletableTask")
            .field("core", &self.core)
            .field("result", &self.result)
            .finish()
    }
}
