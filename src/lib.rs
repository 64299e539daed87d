//! Tickplex: cancel-correct task lifecycle and tick-budgeted region execution
//! for tick-based simulation hosts.
//!
//! # Overview
//!
//! Tickplex lets callers submit units of work that must run on a specific
//! logical execution context (the global tick, an entity's owning context, a
//! spatial region identified by a coarse grid cell, or an unbound async
//! worker) without knowing which concrete host provides the ticks. The host is
//! reached only through the [`TickHost`] contract.
//!
//! # Core Guarantees
//!
//! - **Race-free lifecycle**: every task runs a lock-free compare-and-swap
//!   state machine; concurrent cancellers get exactly one `CancelledByCaller`
//! - **No silent drops**: a cancelled task never runs its body, and a
//!   cancelled completable task resolves its deferred result as cancelled
//! - **Bounded per-tick work**: the [`RegionExecutor`] drains each region's
//!   queue against a wall-clock budget per host tick
//! - **Leak-free shutdown**: closing an executor drains every queued item and
//!   waits until every per-region driver has released its permit
//!
//! # Module Structure
//!
//! - [`types`]: identifiers, coordinates, time, lifecycle enums
//! - [`time`]: time sources (wall clock and virtual clock)
//! - [`sync`]: blocking semaphore and the single-assignment bind cell
//! - [`task`]: task handles, completable tasks and deferred results
//! - [`host`]: the tick-source contract consumed from the host
//! - [`scheduler`]: platform façade and the four scheduler surfaces
//! - [`executor`]: tick-budgeted region executor
//! - [`lab`]: deterministic in-process tick host
//! - [`config`]: configuration types and loading
//! - [`error`](mod@error): error types
//! - [`tracing_compat`]: optional tracing integration

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod error;
pub mod executor;
pub mod host;
pub mod lab;
pub mod scheduler;
pub mod sync;
pub mod task;
pub mod time;
pub mod tracing_compat;
pub mod types;

#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

pub use config::{ExecutorConfig, LabConfig, PlatformConfig};
pub use error::{ConfigError, Error, Result, ScheduleError};
pub use executor::{BudgetScope, RegionExecutor};
pub use host::{Binding, Delay, Entity, HostCapabilities, NativeTask, TickHost, Timing};
pub use lab::{LabEntity, LabHost};
pub use scheduler::{
    AsyncScheduler, EntityScheduler, GlobalScheduler, Platform, RegionScheduler,
    SchedulingStrategy,
};
pub use task::{CompletableTask, Deferred, Task, TaskError, TaskHandle};
pub use time::{TimeSource, VirtualClock, WallClock};
pub use types::{BlockPos, CancelledState, ExecutionState, Owner, RegionKey, Time, WorldId};
