//! Time sources.
//!
//! - [`WallClock`]: production time source backed by `Instant`
//! - [`VirtualClock`]: manually advanced clock for deterministic tests

pub mod clock;

pub use clock::{TimeSource, VirtualClock, WallClock};
