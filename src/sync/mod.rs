//! Blocking synchronization primitives.
//!
//! - [`Semaphore`]: counting permit pool bounding materialized region drivers
//! - [`BindCell`]: single-assignment cell for late-bound native task handles

pub mod bind_cell;
pub mod semaphore;

pub use bind_cell::BindCell;
pub use semaphore::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
