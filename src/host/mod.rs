//! The tick-source contract consumed from the host.
//!
//! A [`TickHost`] accepts one-shot or repeating work bound to a logical
//! context ([`Binding`]) and hands back a cancellable [`NativeTask`]. The
//! semantics of the tick source itself belong to the host; this crate only
//! relies on the following:
//!
//! - work bound to a context always fires on that context
//! - a repeating body never overlaps with itself
//! - once [`NativeTask::cancel`] returns, no new firing starts
//! - for [`Binding::Entity`], a host advertising native entity scheduling runs
//!   the retired callback instead of the work once the entity is gone
//!
//! Capabilities are reported once through [`HostCapabilities`] and negotiated
//! by [`Platform::new`](crate::scheduler::Platform::new).

use crate::error::ScheduleError;
use crate::time::TimeSource;
use crate::types::{Owner, RegionKey};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Work the host fires. Called once for one-shot timing, once per period for
/// repeating timing.
pub type HostWork = Box<dyn FnMut() + Send + 'static>;

/// Callback run when an entity-bound task's entity is gone before firing.
pub type Retired = Box<dyn FnOnce() + Send + 'static>;

/// What a host can do natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HostCapabilities {
    /// Regions tick on independent threads; there is no single main thread.
    pub regionized: bool,
    /// The host can bind work to the context owning a region.
    pub native_region_scheduling: bool,
    /// The host can bind work to an entity and report its retirement.
    pub native_entity_scheduling: bool,
}

impl HostCapabilities {
    /// A classic single-threaded host with only global and async scheduling.
    #[must_use]
    pub const fn global_only() -> Self {
        Self {
            regionized: false,
            native_region_scheduling: false,
            native_entity_scheduling: false,
        }
    }

    /// A single-threaded host that exposes region and entity scheduling.
    #[must_use]
    pub const fn single_threaded_native() -> Self {
        Self {
            regionized: false,
            native_region_scheduling: true,
            native_entity_scheduling: true,
        }
    }

    /// A host whose regions tick concurrently.
    #[must_use]
    pub const fn regionized() -> Self {
        Self {
            regionized: true,
            native_region_scheduling: true,
            native_entity_scheduling: true,
        }
    }
}

/// A span of time before or between firings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delay {
    /// A number of host ticks.
    Ticks(u64),
    /// Wall-clock time; the host converts it to ticks.
    Wall(Duration),
}

impl Delay {
    /// Returns true for a zero-length delay.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        match self {
            Self::Ticks(ticks) => ticks == 0,
            Self::Wall(duration) => duration.is_zero(),
        }
    }

    /// Converts to host ticks, truncating wall time to whole ticks.
    #[must_use]
    pub fn to_ticks(self, ms_per_tick: u64) -> u64 {
        match self {
            Self::Ticks(ticks) => ticks,
            Self::Wall(duration) => {
                let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                millis / ms_per_tick.max(1)
            }
        }
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ticks(ticks) => write!(f, "{ticks} ticks"),
            Self::Wall(duration) => write!(f, "{duration:?}"),
        }
    }
}

/// When work fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timing {
    /// Fire once after `delay`.
    Once {
        /// Delay before the firing.
        delay: Delay,
    },
    /// Fire after `initial`, then every `period`.
    Repeating {
        /// Delay before the first firing.
        initial: Delay,
        /// Delay between firings.
        period: Delay,
    },
}

impl Timing {
    /// Returns true for repeating timing.
    #[must_use]
    pub const fn is_repeating(&self) -> bool {
        matches!(self, Self::Repeating { .. })
    }
}

/// A movable object whose owning context can change or vanish.
pub trait Entity: Send + Sync + fmt::Debug {
    /// Returns false once the entity has been removed.
    fn is_valid(&self) -> bool;

    /// The region currently owning the entity, if known.
    fn region(&self) -> Option<RegionKey>;
}

/// The context a submission is bound to.
pub enum Binding {
    /// The single global tick context.
    Global,
    /// No tick context; any async worker.
    Async,
    /// The context owning a region.
    Region(RegionKey),
    /// The context currently owning an entity.
    Entity {
        /// The entity.
        entity: Arc<dyn Entity>,
        /// Run instead of the work if the entity is gone at firing time.
        retired: Retired,
    },
}

impl Binding {
    /// Returns true for [`Binding::Async`].
    #[must_use]
    pub const fn is_async(&self) -> bool {
        matches!(self, Self::Async)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("Global"),
            Self::Async => f.write_str("Async"),
            Self::Region(key) => f.debug_tuple("Region").field(key).finish(),
            Self::Entity { entity, .. } => f
                .debug_struct("Entity")
                .field("entity", entity)
                .finish_non_exhaustive(),
        }
    }
}

/// The host's own handle for submitted work.
pub trait NativeTask: Send + Sync {
    /// Stops future firings. Idempotent; never blocks.
    fn cancel(&self);

    /// Returns true once cancelled.
    fn is_cancelled(&self) -> bool;
}

/// A provider of ticks.
pub trait TickHost: Send + Sync + fmt::Debug {
    /// The host's capabilities. Read once at platform construction.
    fn capabilities(&self) -> HostCapabilities;

    /// Submits work bound to a context.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::HostShutdown`] if the host no longer accepts work;
    /// [`ScheduleError::EntityRetired`] if an entity binding is already gone.
    fn submit(
        &self,
        owner: &Owner,
        binding: Binding,
        timing: Timing,
        work: HostWork,
    ) -> Result<Arc<dyn NativeTask>, ScheduleError>;

    /// The number of the host tick currently in progress (or last completed).
    ///
    /// Used as the epoch token for shared per-tick budgets.
    fn current_tick(&self) -> u64;

    /// The clock budgets are measured against.
    fn time_source(&self) -> Arc<dyn TimeSource>;
}
