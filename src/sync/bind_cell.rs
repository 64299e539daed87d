//! Single-assignment cell for late-bound handles.
//!
//! A task is constructed before its native host handle exists: the host only
//! hands the handle back once it has accepted the work, and the work already
//! references the task. [`BindCell`] holds that handle. It is written exactly
//! once, right after submission, and readers that arrive first simply see
//! `None`; they never wait.

use std::fmt;
use std::sync::OnceLock;

/// A cell written at most once and read without blocking.
pub struct BindCell<T> {
    value: OnceLock<T>,
}

impl<T> BindCell<T> {
    /// Creates an empty cell.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: OnceLock::new(),
        }
    }

    /// Binds the value.
    ///
    /// Returns `Err(value)` if the cell was already bound.
    pub fn bind(&self, value: T) -> Result<(), T> {
        self.value.set(value)
    }

    /// Returns the bound value, if any.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Returns `true` once the cell has been bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T> Default for BindCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for BindCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.get() {
            Some(value) => f.debug_tuple("BindCell").field(value).finish(),
            None => f.write_str("BindCell(<unbound>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn binds_exactly_once() {
        let cell = BindCell::new();
        assert!(!cell.is_bound());
        assert_eq!(cell.get(), None);

        assert_eq!(cell.bind(7), Ok(()));
        assert_eq!(cell.bind(8), Err(8));
        assert_eq!(cell.get(), Some(&7));
    }

    #[test]
    fn racing_binders_have_one_winner() {
        let cell = Arc::new(BindCell::new());
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cell = Arc::clone(&cell);
                let wins = Arc::clone(&wins);
                thread::spawn(move || {
                    if cell.bind(i).is_ok() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("binder thread");
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert!(cell.is_bound());
    }

    #[test]
    fn debug_shows_binding_state() {
        let cell: BindCell<u8> = BindCell::default();
        assert_eq!(format!("{cell:?}"), "BindCell(<unbound>)");
        let _ = cell.bind(3);
        assert_eq!(format!("{cell:?}"), "BindCell(3)");
    }
}
