//! The lock-free task lifecycle state machine.
//!
//! Every task, one-shot or repeating, plain or completable, is driven by a
//! [`TaskCore`]: one atomic state word plus the late-bound native handle.
//!
//! # Transitions
//!
//! ```text
//! one-shot:   Idle ──fire──► Running ──done──► Finished
//!               └──cancel──► Cancelled
//!
//! repeating:  Idle ◄──done── Running
//!               │              │ cancel
//!               │ cancel       ▼
//!               └────────► Cancelled ◄──done── CancelledRunning
//! ```
//!
//! A one-shot task that is already running cannot be cancelled; the attempt
//! reports [`CancelledState::Running`] and the body runs to completion.

use crate::host::NativeTask;
use crate::sync::BindCell;
use crate::types::{CancelledState, ExecutionState, Owner, TaskId};
use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering, fence};

/// Shared lifecycle state of one scheduled unit of work.
pub struct TaskCore {
    id: TaskId,
    owner: Owner,
    repeating: bool,
    is_async: bool,
    state: AtomicU8,
    native: BindCell<Arc<dyn NativeTask>>,
}

impl TaskCore {
    /// Creates an idle task core. The native handle is bound later.
    #[must_use]
    pub fn new(owner: Owner, repeating: bool, is_async: bool) -> Self {
        Self {
            id: TaskId::next(),
            owner,
            repeating,
            is_async,
            state: AtomicU8::new(ExecutionState::Idle.as_u8()),
            native: BindCell::new(),
        }
    }

    /// Diagnostic identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The submitter owning the task.
    #[must_use]
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Whether the task fires more than once.
    #[must_use]
    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    /// Whether the task runs off the tick contexts.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Current state.
    #[must_use]
    pub fn execution_state(&self) -> ExecutionState {
        // Only valid encodings are ever stored.
        ExecutionState::from_u8(self.state.load(Ordering::SeqCst))
            .unwrap_or(ExecutionState::Cancelled)
    }

    /// Whether the native handle has been bound yet.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.native.is_bound()
    }

    fn transition(&self, from: ExecutionState, to: ExecutionState) -> Result<(), ExecutionState> {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|actual| ExecutionState::from_u8(actual).unwrap_or(ExecutionState::Cancelled))
    }

    /// Requests cancellation.
    ///
    /// Never blocks. Concurrent callers each get a consistent answer and at
    /// most one of them gets a `*ByCaller`/`NextRunsCancelled` outcome.
    pub fn cancel(&self) -> CancelledState {
        let mut current = self.execution_state();
        loop {
            match current {
                ExecutionState::Idle => {
                    match self.transition(ExecutionState::Idle, ExecutionState::Cancelled) {
                        Ok(()) => {
                            self.cancel_native();
                            return CancelledState::CancelledByCaller;
                        }
                        Err(actual) => current = actual,
                    }
                }
                ExecutionState::Running => {
                    if !self.repeating {
                        return CancelledState::Running;
                    }
                    match self.transition(ExecutionState::Running, ExecutionState::CancelledRunning)
                    {
                        Ok(()) => {
                            self.cancel_native();
                            return CancelledState::NextRunsCancelled;
                        }
                        Err(actual) => current = actual,
                    }
                }
                ExecutionState::CancelledRunning => {
                    return CancelledState::NextRunsCancelledAlready;
                }
                ExecutionState::Finished => return CancelledState::AlreadyExecuted,
                ExecutionState::Cancelled => return CancelledState::CancelledAlready,
            }
        }
    }

    /// Fires the task: runs `action` if the task is idle.
    ///
    /// Returns `false` without running anything if the task was cancelled
    /// (or is somehow already running). State cleanup happens on every exit
    /// path, including a panicking `action`; the panic itself propagates.
    pub fn run<F: FnOnce()>(&self, action: F) -> bool {
        if self
            .transition(ExecutionState::Idle, ExecutionState::Running)
            .is_err()
        {
            return false;
        }
        let _guard = RunGuard { core: self };
        action();
        true
    }

    /// Cancels an idle task on behalf of its host, for entity retirement.
    ///
    /// Returns `true` if this call moved the task to `Cancelled`.
    pub(crate) fn retire(&self) -> bool {
        if self
            .transition(ExecutionState::Idle, ExecutionState::Cancelled)
            .is_ok()
        {
            self.cancel_native();
            true
        } else {
            false
        }
    }

    /// Binds the host's handle once the host accepted the submission.
    ///
    /// A cancellation that won the race against binding is replayed onto the
    /// native handle here.
    pub(crate) fn bind_native(&self, native: Arc<dyn NativeTask>) {
        if self.native.bind(native).is_err() {
            return;
        }
        fence(Ordering::SeqCst);
        if self.execution_state().is_cancelled() {
            self.cancel_native();
        }
    }

    fn cancel_native(&self) {
        fence(Ordering::SeqCst);
        if let Some(native) = self.native.get() {
            native.cancel();
        }
    }
}

impl fmt::Debug for TaskCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCore")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("repeating", &self.repeating)
            .field("async", &self.is_async)
            .field("state", &self.execution_state())
            .field("bound", &self.native.is_bound())
            .finish()
    }
}

struct RunGuard<'a> {
    core: &'a TaskCore,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.core.repeating {
            self.core
                .state
                .store(ExecutionState::Finished.as_u8(), Ordering::SeqCst);
        } else if self
            .core
            .transition(ExecutionState::Running, ExecutionState::Idle)
            .is_err()
        {
            let _ = self
                .core
                .transition(ExecutionState::CancelledRunning, ExecutionState::Cancelled);
        }
    }
}
