//! Tasks, their lifecycle, and their results.
//!
//! - [`TaskCore`]: the compare-and-swap lifecycle state machine
//! - [`Task`]: observation and cancellation, implemented by every handle
//! - [`TaskHandle`]: a task without a result (repeating work)
//! - [`CompletableTask`]: a one-shot task resolving a [`Deferred`]
//! - [`Deferred`]: write-once result, pollable, blockable and awaitable

pub mod completable;
pub mod core;
pub mod deferred;
pub mod handle;

pub use self::core::TaskCore;
pub use completable::CompletableTask;
pub use deferred::Deferred;
pub use handle::{Task, TaskHandle};

pub use crate::error::TaskError;
