//! Deterministic in-process tick host.
//!
//! [`LabHost`] implements [`TickHost`] without threads of its own: every call
//! to [`LabHost::tick`] advances the tick counter by one and fires, on the
//! calling thread, all work due at or before the new tick, ordered by due
//! tick and then by submission order. This makes scheduling behaviour
//! reproducible in tests and lets embedders drive ticks from their own loop.
//!
//! - Wall-clock delays are converted to ticks by truncating division with
//!   [`LabConfig::ms_per_tick`].
//! - Work submitted while a tick is firing is never fired in that same tick.
//! - The host lock is not held while work runs, so work may submit or
//!   cancel other work.
//! - A panicking body is caught at the top level and counted in
//!   [`LabHost::faults`]; it never unwinds out of `tick`.
//! - Entity-bound work whose entity is gone at firing time is cancelled and
//!   its retired callback runs instead, on the same context.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use tickplex::host::{Binding, Delay, TickHost, Timing};
//! use tickplex::{LabConfig, LabHost, Owner};
//!
//! let host = LabHost::new(LabConfig::paper_like());
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counter = hits.clone();
//! host.submit(
//!     &Owner::new("docs"),
//!     Binding::Global,
//!     Timing::Once { delay: Delay::Ticks(2) },
//!     Box::new(move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     }),
//! )
//! .expect("submit");
//!
//! host.tick();
//! assert_eq!(hits.load(Ordering::SeqCst), 0);
//! host.tick();
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

pub mod entity;

pub use entity::LabEntity;

use crate::config::LabConfig;
use crate::error::{ConfigError, ScheduleError};
use crate::host::{Binding, Entity, HostCapabilities, HostWork, NativeTask, Retired, TickHost, Timing};
use crate::time::{TimeSource, VirtualClock, WallClock};
use crate::tracing_compat::{debug, trace};
use crate::types::{Owner, RegionKey};
use core::fmt;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// The context a lab firing runs on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LabContext {
    /// The global tick context.
    Global,
    /// An async worker.
    Async,
    /// The context owning a region.
    Region(RegionKey),
}

thread_local! {
    static CURRENT_CONTEXT: RefCell<Option<LabContext>> = const { RefCell::new(None) };
}

struct ContextGuard {
    previous: Option<LabContext>,
}

impl ContextGuard {
    fn enter(context: LabContext) -> Self {
        let previous = CURRENT_CONTEXT.with(|current| current.replace(Some(context)));
        Self { previous }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_CONTEXT.with(|current| *current.borrow_mut() = previous);
    }
}

#[derive(Debug, Default)]
struct LabNative {
    cancelled: AtomicBool,
}

impl NativeTask for LabNative {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

enum Placement {
    Fixed(LabContext),
    Entity {
        entity: Arc<dyn Entity>,
        retired: Option<Retired>,
    },
}

impl Placement {
    fn context(&self) -> LabContext {
        match self {
            Self::Fixed(context) => context.clone(),
            Self::Entity { entity, .. } => entity
                .region()
                .map_or(LabContext::Global, LabContext::Region),
        }
    }
}

struct Scheduled {
    owner: Owner,
    placement: Placement,
    period: Option<u64>,
    work: HostWork,
    native: Arc<LabNative>,
}

/// Deterministic tick source for tests and embedders.
pub struct LabHost {
    config: LabConfig,
    clock: Arc<dyn TimeSource>,
    tick: AtomicU64,
    next_seq: AtomicU64,
    faults: AtomicU64,
    shut_down: AtomicBool,
    queue: Mutex<BTreeMap<(u64, u64), Scheduled>>,
}

impl LabHost {
    /// Creates a lab host measuring budgets against the wall clock.
    ///
    /// A zero `ms_per_tick` is treated as 1.
    #[must_use]
    pub fn new(config: LabConfig) -> Self {
        Self::with_time_source(config, Arc::new(WallClock::new()))
    }

    /// Creates a lab host after validating `config`.
    pub fn try_new(config: LabConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Creates a lab host measuring budgets against a virtual clock.
    #[must_use]
    pub fn with_clock(config: LabConfig, clock: Arc<VirtualClock>) -> Self {
        Self::with_time_source(config, clock)
    }

    /// Creates a lab host with an arbitrary time source.
    #[must_use]
    pub fn with_time_source(mut config: LabConfig, clock: Arc<dyn TimeSource>) -> Self {
        config.ms_per_tick = config.ms_per_tick.max(1);
        Self {
            config,
            clock,
            tick: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
            faults: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
            queue: Mutex::new(BTreeMap::new()),
        }
    }

    /// The host configuration.
    #[must_use]
    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    /// Advances one tick and fires everything due. Returns the number of
    /// bodies and retired callbacks run.
    pub fn tick(&self) -> usize {
        let now = self.tick.fetch_add(1, Ordering::SeqCst) + 1;
        let due = {
            let mut queue = self.queue.lock();
            let later = queue.split_off(&(now + 1, 0));
            std::mem::replace(&mut *queue, later)
        };

        let mut fired = 0;
        for ((_, seq), mut entry) in due {
            if entry.native.is_cancelled() || self.is_shut_down() {
                continue;
            }
            let context = entry.placement.context();

            if let Placement::Entity { entity, retired } = &mut entry.placement {
                if !entity.is_valid() {
                    entry.native.cancel();
                    if let Some(retired) = retired.take() {
                        self.fire(context, retired);
                        fired += 1;
                    }
                    trace!(owner = %entry.owner, tick = now, "lab entity retired");
                    continue;
                }
            }

            self.fire(context, &mut entry.work);
            fired += 1;

            if let Some(period) = entry.period {
                if !entry.native.is_cancelled() && !self.is_shut_down() {
                    self.queue.lock().insert((now + period, seq), entry);
                }
            }
        }

        trace!(tick = now, fired, "lab tick");
        fired
    }

    /// Runs `n` ticks. Returns the total number fired.
    pub fn run_ticks(&self, n: u64) -> usize {
        (0..n).map(|_| self.tick()).sum()
    }

    /// Ticks until nothing is pending or `max_ticks` have run. Returns the
    /// number of ticks run.
    pub fn run_until_idle(&self, max_ticks: u64) -> u64 {
        let mut ran = 0;
        while ran < max_ticks && self.pending() > 0 {
            self.tick();
            ran += 1;
        }
        ran
    }

    /// Number of live (not cancelled) scheduled entries.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .values()
            .filter(|entry| !entry.native.is_cancelled())
            .count()
    }

    /// Number of panics caught from plain bodies.
    #[must_use]
    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::SeqCst)
    }

    /// The context firing on this thread, if any.
    #[must_use]
    pub fn current_context() -> Option<LabContext> {
        CURRENT_CONTEXT.with(|current| current.borrow().clone())
    }

    /// Stops accepting work and drops everything scheduled. Returns the
    /// number of entries dropped.
    ///
    /// Tasks whose work is dropped here settle to `Cancelled`, and their
    /// results resolve as cancelled.
    pub fn shutdown(&self) -> usize {
        self.shut_down.store(true, Ordering::SeqCst);
        let dropped = std::mem::take(&mut *self.queue.lock());
        for entry in dropped.values() {
            entry.native.cancel();
        }
        debug!(dropped = dropped.len(), "lab host shut down");
        dropped.len()
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn fire<F: FnOnce()>(&self, context: LabContext, work: F) {
        let _guard = ContextGuard::enter(context);
        if catch_unwind(AssertUnwindSafe(work)).is_err() {
            self.faults.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl TickHost for LabHost {
    fn capabilities(&self) -> HostCapabilities {
        self.config.capabilities()
    }

    fn submit(
        &self,
        owner: &Owner,
        binding: Binding,
        timing: Timing,
        work: HostWork,
    ) -> Result<Arc<dyn NativeTask>, ScheduleError> {
        if self.is_shut_down() {
            return Err(ScheduleError::HostShutdown);
        }
        let placement = match binding {
            Binding::Global => Placement::Fixed(LabContext::Global),
            Binding::Async => Placement::Fixed(LabContext::Async),
            Binding::Region(key) => Placement::Fixed(LabContext::Region(key)),
            Binding::Entity { entity, retired } => {
                if !entity.is_valid() {
                    return Err(ScheduleError::EntityRetired);
                }
                Placement::Entity {
                    entity,
                    retired: Some(retired),
                }
            }
        };

        let ms_per_tick = self.config.ms_per_tick;
        let (delay, period) = match timing {
            Timing::Once { delay } => (delay.to_ticks(ms_per_tick), None),
            Timing::Repeating { initial, period } => (
                initial.to_ticks(ms_per_tick),
                Some(period.to_ticks(ms_per_tick).max(1)),
            ),
        };

        let native = Arc::new(LabNative::default());
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let due = self.current_tick().saturating_add(delay);
        self.queue.lock().insert(
            (due, seq),
            Scheduled {
                owner: owner.clone(),
                placement,
                period,
                work,
                native: Arc::clone(&native),
            },
        );
        Ok(native)
    }

    fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }

    fn time_source(&self) -> Arc<dyn TimeSource> {
        Arc::clone(&self.clock)
    }
}

impl fmt::Debug for LabHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabHost")
            .field("config", &self.config)
            .field("tick", &self.current_tick())
            .field("pending", &self.pending())
            .field("faults", &self.faults())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Delay;
    use crate::test_utils::test_world;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    fn owner() -> Owner {
        Owner::new("lab-test")
    }

    fn counter_work(counter: &Arc<AtomicUsize>) -> HostWork {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn one_shot_fires_once_at_its_tick() {
        init_test("one_shot_fires_once_at_its_tick");
        let host = LabHost::new(LabConfig::paper_like());
        let hits = Arc::new(AtomicUsize::new(0));
        host.submit(
            &owner(),
            Binding::Global,
            Timing::Once {
                delay: Delay::Ticks(3),
            },
            counter_work(&hits),
        )
        .expect("submit");

        host.run_ticks(2);
        let early = hits.load(Ordering::SeqCst);
        crate::assert_with_log!(early == 0, "not yet due", 0, early);
        host.run_ticks(5);
        let total = hits.load(Ordering::SeqCst);
        crate::assert_with_log!(total == 1, "fired once", 1, total);
        let pending = host.pending();
        crate::assert_with_log!(pending == 0, "nothing pending", 0, pending);
        crate::test_complete!("one_shot_fires_once_at_its_tick");
    }

    #[test]
    fn repeating_fires_every_period_until_cancelled() {
        init_test("repeating_fires_every_period_until_cancelled");
        let host = LabHost::new(LabConfig::paper_like());
        let hits = Arc::new(AtomicUsize::new(0));
        let native = host
            .submit(
                &owner(),
                Binding::Global,
                Timing::Repeating {
                    initial: Delay::Ticks(1),
                    period: Delay::Ticks(2),
                },
                counter_work(&hits),
            )
            .expect("submit");

        host.run_ticks(5);
        let fired = hits.load(Ordering::SeqCst);
        crate::assert_with_log!(fired == 3, "ticks 1, 3, 5", 3, fired);
        native.cancel();
        host.run_ticks(5);
        let after = hits.load(Ordering::SeqCst);
        crate::assert_with_log!(after == 3, "no firing after cancel", 3, after);
        crate::test_complete!("repeating_fires_every_period_until_cancelled");
    }

    #[test]
    fn wall_delays_convert_to_ticks() {
        init_test("wall_delays_convert_to_ticks");
        let host = LabHost::new(LabConfig::spigot_like());
        let hits = Arc::new(AtomicUsize::new(0));
        host.submit(
            &owner(),
            Binding::Async,
            Timing::Once {
                delay: Delay::Wall(Duration::from_millis(120)),
            },
            counter_work(&hits),
        )
        .expect("submit");
        host.tick();
        let first = hits.load(Ordering::SeqCst);
        crate::assert_with_log!(first == 0, "120ms is two ticks", 0, first);
        host.tick();
        let second = hits.load(Ordering::SeqCst);
        crate::assert_with_log!(second == 1, "fires on tick two", 1, second);
        crate::test_complete!("wall_delays_convert_to_ticks");
    }

    #[test]
    fn firings_report_their_context() {
        init_test("firings_report_their_context");
        let host = LabHost::new(LabConfig::folia_like());
        let key = RegionKey::new(test_world(), 2, -1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        for binding in [
            Binding::Global,
            Binding::Async,
            Binding::Region(key.clone()),
        ] {
            let seen = Arc::clone(&seen);
            host.submit(
                &owner(),
                binding,
                Timing::Once {
                    delay: Delay::Ticks(1),
                },
                Box::new(move || seen.lock().push(LabHost::current_context())),
            )
            .expect("submit");
        }
        host.tick();
        let seen = seen.lock().clone();
        let expected = vec![
            Some(LabContext::Global),
            Some(LabContext::Async),
            Some(LabContext::Region(key)),
        ];
        crate::assert_with_log!(seen == expected, "contexts in order", expected, seen);
        let outside = LabHost::current_context();
        crate::assert_with_log!(outside.is_none(), "no context outside", None::<LabContext>, outside);
        crate::test_complete!("firings_report_their_context");
    }

    #[test]
    fn work_submitted_during_tick_waits_for_next_tick() {
        init_test("work_submitted_during_tick_waits_for_next_tick");
        let host = Arc::new(LabHost::new(LabConfig::spigot_like()));
        let hits = Arc::new(AtomicUsize::new(0));
        let inner_host = Arc::clone(&host);
        let inner_hits = Arc::clone(&hits);
        host.submit(
            &owner(),
            Binding::Global,
            Timing::Once {
                delay: Delay::Ticks(1),
            },
            Box::new(move || {
                inner_host
                    .submit(
                        &Owner::new("nested"),
                        Binding::Async,
                        Timing::Once {
                            delay: Delay::Ticks(0),
                        },
                        counter_work(&inner_hits),
                    )
                    .expect("nested submit");
            }),
        )
        .expect("submit");

        let first = host.tick();
        crate::assert_with_log!(first == 1, "only outer fired", 1, first);
        let second = host.tick();
        crate::assert_with_log!(second == 1, "nested fired next tick", 1, second);
        let hits = hits.load(Ordering::SeqCst);
        crate::assert_with_log!(hits == 1, "nested ran", 1, hits);
        crate::test_complete!("work_submitted_during_tick_waits_for_next_tick");
    }

    #[test]
    fn panics_are_counted_not_propagated() {
        init_test("panics_are_counted_not_propagated");
        let host = LabHost::new(LabConfig::spigot_like());
        host.submit(
            &owner(),
            Binding::Global,
            Timing::Once {
                delay: Delay::Ticks(1),
            },
            Box::new(|| panic!("body failure")),
        )
        .expect("submit");
        host.tick();
        let faults = host.faults();
        crate::assert_with_log!(faults == 1, "fault counted", 1, faults);
        crate::test_complete!("panics_are_counted_not_propagated");
    }

    #[test]
    fn entity_retirement_runs_callback_instead_of_work() {
        init_test("entity_retirement_runs_callback_instead_of_work");
        let host = LabHost::new(LabConfig::paper_like());
        let entity = Arc::new(LabEntity::new("zombie", None));
        let hits = Arc::new(AtomicUsize::new(0));
        let retirements = Arc::new(AtomicUsize::new(0));
        let retired_counter = Arc::clone(&retirements);
        let native = host
            .submit(
                &owner(),
                Binding::Entity {
                    entity: entity.clone(),
                    retired: Box::new(move || {
                        retired_counter.fetch_add(1, Ordering::SeqCst);
                    }),
                },
                Timing::Repeating {
                    initial: Delay::Ticks(1),
                    period: Delay::Ticks(1),
                },
                counter_work(&hits),
            )
            .expect("submit");

        host.tick();
        entity.remove();
        host.run_ticks(3);
        let hits = hits.load(Ordering::SeqCst);
        let retirements = retirements.load(Ordering::SeqCst);
        crate::assert_with_log!(hits == 1, "one firing before removal", 1, hits);
        crate::assert_with_log!(retirements == 1, "retired once", 1, retirements);
        let cancelled = native.is_cancelled();
        crate::assert_with_log!(cancelled, "native cancelled", true, cancelled);

        let gone = host.submit(
            &owner(),
            Binding::Entity {
                entity,
                retired: Box::new(|| {}),
            },
            Timing::Once {
                delay: Delay::Ticks(1),
            },
            Box::new(|| {}),
        );
        let rejected = matches!(gone, Err(ScheduleError::EntityRetired));
        crate::assert_with_log!(rejected, "removed entity rejected", true, rejected);
        crate::test_complete!("entity_retirement_runs_callback_instead_of_work");
    }

    #[test]
    fn shutdown_drops_work_and_rejects_submissions() {
        init_test("shutdown_drops_work_and_rejects_submissions");
        let host = LabHost::new(LabConfig::spigot_like());
        let hits = Arc::new(AtomicUsize::new(0));
        let native = host
            .submit(
                &owner(),
                Binding::Global,
                Timing::Once {
                    delay: Delay::Ticks(1),
                },
                counter_work(&hits),
            )
            .expect("submit");
        let dropped = host.shutdown();
        crate::assert_with_log!(dropped == 1, "one entry dropped", 1, dropped);
        crate::assert_with_log!(native.is_cancelled(), "native cancelled", true, native.is_cancelled());
        host.tick();
        let hits = hits.load(Ordering::SeqCst);
        crate::assert_with_log!(hits == 0, "nothing fired", 0, hits);
        let err = host
            .submit(
                &owner(),
                Binding::Global,
                Timing::Once {
                    delay: Delay::Ticks(1),
                },
                Box::new(|| {}),
            )
            .err();
        crate::assert_with_log!(
            err == Some(ScheduleError::HostShutdown),
            "rejected after shutdown",
            Some(ScheduleError::HostShutdown),
            err
        );
        crate::test_complete!("shutdown_drops_work_and_rejects_submissions");
    }

    #[test]
    fn try_new_validates() {
        let err = LabHost::try_new(LabConfig::spigot_like().ms_per_tick(0)).err();
        assert_eq!(err.map(|e| e.to_string()), Some("lab ms_per_tick must be at least 1, got 0".into()));
        assert!(LabHost::try_new(LabConfig::folia_like()).is_ok());
    }
}
