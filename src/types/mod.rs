//! Core types for tickplex.
//!
//! - [`id`]: identifiers (`TaskId`, `Owner`, `WorldId`) and `Time`
//! - [`region`]: region keys and block positions
//! - [`state`]: task lifecycle states and cancellation outcomes

pub mod id;
pub mod region;
pub mod state;

pub use id::{Owner, TaskId, Time, WorldId};
pub use region::{BlockPos, REGION_SHIFT, RegionKey};
pub use state::{CancelledState, ExecutionState};
