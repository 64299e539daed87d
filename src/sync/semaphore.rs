//! Blocking counting semaphore with RAII permits.
//!
//! The region executor holds one permit per materialized region driver. A
//! permit is returned when the driver tears itself down, and closing the
//! executor blocks until every permit has come back.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tickplex::sync::Semaphore;
//!
//! let sem = Arc::new(Semaphore::new(2));
//! let permit = Semaphore::try_acquire_owned(&sem, 1).expect("permit available");
//! assert_eq!(sem.available_permits(), 1);
//!
//! // Permit is automatically released when dropped
//! drop(permit);
//! assert_eq!(sem.available_permits(), 2);
//! ```

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Error returned when trying to acquire more permits than available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryAcquireError;

impl std::fmt::Display for TryAcquireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no semaphore permits available")
    }
}

impl std::error::Error for TryAcquireError {}

/// A counting semaphore whose waiters block the calling thread.
#[derive(Debug)]
pub struct Semaphore {
    /// Number of available permits.
    permits: Mutex<usize>,
    /// Signalled whenever permits are returned.
    returned: Condvar,
    /// Maximum permits (initial count).
    max_permits: usize,
}

impl Semaphore {
    /// Creates a new semaphore with the given number of permits.
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            returned: Condvar::new(),
            max_permits: permits,
        }
    }

    /// Creates a semaphore that never runs out of permits in practice.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Returns the number of currently available permits.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        *self.permits.lock()
    }

    /// Tries to acquire `count` owned permits without waiting.
    pub fn try_acquire_owned(
        semaphore: &Arc<Self>,
        count: usize,
    ) -> Result<OwnedSemaphorePermit, TryAcquireError> {
        let mut permits = semaphore.permits.lock();
        if *permits < count {
            return Err(TryAcquireError);
        }
        *permits -= count;
        drop(permits);
        Ok(OwnedSemaphorePermit {
            semaphore: Arc::clone(semaphore),
            count,
        })
    }

    /// Blocks until at least `count` permits are available, without taking
    /// them.
    ///
    /// Another thread may take the permits before the caller does, so callers
    /// retry [`try_acquire_owned`](Self::try_acquire_owned) in a loop.
    pub fn wait_for_available(&self, count: usize) {
        assert!(
            count <= self.max_permits,
            "cannot wait for more permits than semaphore capacity"
        );
        let mut permits = self.permits.lock();
        while *permits < count {
            self.returned.wait(&mut permits);
        }
    }

    /// Blocks until every permit has been returned.
    pub fn wait_until_full(&self) {
        let mut permits = self.permits.lock();
        while *permits != self.max_permits {
            self.returned.wait(&mut permits);
        }
    }

    /// Blocks until every permit has been returned or the timeout elapses.
    ///
    /// Returns true if the semaphore is full.
    pub fn wait_until_full_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut permits = self.permits.lock();
        while *permits != self.max_permits {
            if self.returned.wait_until(&mut permits, deadline).timed_out() {
                return *permits == self.max_permits;
            }
        }
        true
    }

    fn add_permits(&self, count: usize) {
        let mut permits = self.permits.lock();
        *permits += count;
        debug_assert!(*permits <= self.max_permits, "semaphore over-released");
        drop(permits);
        self.returned.notify_all();
    }
}

/// An owned permit from a semaphore.
#[derive(Debug)]
#[must_use = "permit will be immediately released if not held"]
pub struct OwnedSemaphorePermit {
    semaphore: Arc<Semaphore>,
    count: usize,
}

impl Drop for OwnedSemaphorePermit {
    fn drop(&mut self) {
        self.semaphore.add_permits(self.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn try_acquire_fails_when_exhausted() {
        let sem = Arc::new(Semaphore::new(1));
        let held = Semaphore::try_acquire_owned(&sem, 1).expect("first permit");
        assert_eq!(sem.available_permits(), 0);
        assert_eq!(
            Semaphore::try_acquire_owned(&sem, 1).unwrap_err(),
            TryAcquireError
        );
        drop(held);
        assert_eq!(sem.available_permits(), 1);
    }

    #[test]
    fn unbounded_semaphore_hands_out_many_permits() {
        let sem = Arc::new(Semaphore::unbounded());
        let permits: Vec<_> = (0..1000)
            .map(|_| Semaphore::try_acquire_owned(&sem, 1).expect("unbounded"))
            .collect();
        assert_eq!(sem.available_permits(), usize::MAX - 1000);
        drop(permits);
        assert!(sem.wait_until_full_timeout(Duration::ZERO));
    }

    #[test]
    fn wait_for_available_blocks_until_release() {
        let sem = Arc::new(Semaphore::new(1));
        let held = Semaphore::try_acquire_owned(&sem, 1).expect("permit");
        let woke = Arc::new(AtomicBool::new(false));

        let waiter = {
            let sem = Arc::clone(&sem);
            let woke = Arc::clone(&woke);
            thread::spawn(move || {
                sem.wait_for_available(1);
                woke.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!woke.load(Ordering::SeqCst));
        drop(held);
        waiter.join().expect("waiter thread");
        assert!(woke.load(Ordering::SeqCst));
        // Waiting never takes the permit.
        assert_eq!(sem.available_permits(), 1);
    }

    #[test]
    fn wait_until_full_returns_after_all_permits_come_back() {
        let sem = Arc::new(Semaphore::new(3));
        let a = Semaphore::try_acquire_owned(&sem, 1).expect("a");
        let b = Semaphore::try_acquire_owned(&sem, 2).expect("b");
        assert!(!sem.wait_until_full_timeout(Duration::from_millis(5)));

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            drop(a);
            thread::sleep(Duration::from_millis(10));
            drop(b);
        });

        sem.wait_until_full();
        assert_eq!(sem.available_permits(), 3);
        releaser.join().expect("releaser thread");
    }
}
