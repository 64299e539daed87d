//! Write-once deferred results.
//!
//! A [`Deferred`] is resolved at most once, with a value or a [`TaskError`].
//! The first resolution wins; later attempts are no-ops that report `false`.
//! Callers can poll it, block on it, or `.await` it.

use crate::error::TaskError;
use core::fmt;
use parking_lot::{Condvar, Mutex};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

enum Slot<T> {
    Pending(Vec<Waker>),
    Ready(Result<T, TaskError>),
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    resolved: Condvar,
}

/// A shared handle to a write-once result.
pub struct Deferred<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deferred<T> {
    /// Creates an unresolved result.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::Pending(Vec::new())),
                resolved: Condvar::new(),
            }),
        }
    }

    /// Resolves with a value. Returns `false` if already resolved.
    pub fn complete(&self, value: T) -> bool {
        self.resolve(Ok(value))
    }

    /// Resolves exceptionally. Returns `false` if already resolved.
    pub fn fail(&self, error: TaskError) -> bool {
        self.resolve(Err(error))
    }

    /// Resolves as cancelled. Returns `false` if already resolved.
    pub fn cancel(&self) -> bool {
        self.resolve(Err(TaskError::Cancelled))
    }

    /// Resolves with `outcome` unless already resolved.
    pub fn resolve(&self, outcome: Result<T, TaskError>) -> bool {
        let wakers = {
            let mut slot = self.shared.slot.lock();
            match &mut *slot {
                Slot::Ready(_) => return false,
                Slot::Pending(wakers) => {
                    let wakers = std::mem::take(wakers);
                    *slot = Slot::Ready(outcome);
                    wakers
                }
            }
        };
        self.shared.resolved.notify_all();
        for waker in wakers {
            waker.wake();
        }
        true
    }

    /// Returns true once resolved, in any way.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Ready(_))
    }

    /// Returns true if resolved as cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            *self.shared.slot.lock(),
            Slot::Ready(Err(TaskError::Cancelled))
        )
    }

    /// Returns true if resolved with any error, cancellation included.
    #[must_use]
    pub fn is_completed_exceptionally(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Ready(Err(_)))
    }

    /// Returns true if both handles refer to the same result.
    #[must_use]
    pub fn same_result(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T: Clone> Deferred<T> {
    /// Returns the outcome if resolved.
    #[must_use]
    pub fn try_get(&self) -> Option<Result<T, TaskError>> {
        match &*self.shared.slot.lock() {
            Slot::Ready(outcome) => Some(outcome.clone()),
            Slot::Pending(_) => None,
        }
    }

    /// Blocks the calling thread until resolved.
    ///
    /// Never call this from the context that is supposed to resolve it.
    pub fn wait(&self) -> Result<T, TaskError> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Slot::Ready(outcome) = &*slot {
                return outcome.clone();
            }
            self.shared.resolved.wait(&mut slot);
        }
    }

    /// Blocks until resolved or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, TaskError>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        loop {
            if let Slot::Ready(outcome) = &*slot {
                return Some(outcome.clone());
            }
            if self
                .shared
                .resolved
                .wait_until(&mut slot, deadline)
                .timed_out()
            {
                return match &*slot {
                    Slot::Ready(outcome) => Some(outcome.clone()),
                    Slot::Pending(_) => None,
                };
            }
        }
    }
}

impl<T: Clone> Future for Deferred<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.shared.slot.lock();
        match &mut *slot {
            Slot::Ready(outcome) => Poll::Ready(outcome.clone()),
            Slot::Pending(wakers) => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.shared.slot.lock() {
            Slot::Pending(_) => "pending",
            Slot::Ready(Ok(_)) => "completed",
            Slot::Ready(Err(TaskError::Cancelled)) => "cancelled",
            Slot::Ready(Err(_)) => "failed",
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}
