//! Tick-budgeted region executor.
//!
//! [`RegionExecutor`] batches small work items per [`RegionKey`]. The first
//! item queued for a key materializes a *driver*: one repeating task on the
//! region scheduler, firing every tick on the context owning that key. Each
//! firing drains the key's queue in FIFO order until the queue is empty or the
//! per-tick [`TickBudget`] deadline passes. The deadline is checked between
//! items only, so a slow item can overrun it.
//!
//! # Permits
//!
//! Every driver holds one permit from a counting [`Semaphore`] sized by
//! [`ExecutorConfig::max_active_keys`]. [`RegionExecutor::queue`] blocks for a
//! permit when a new key would exceed the cap; [`RegionExecutor::try_queue`]
//! fails with [`ScheduleError::Saturated`] instead. Producers for a key that
//! already has a driver never wait.
//!
//! # Closing
//!
//! [`RegionExecutor::close`] is a drain, not an abort. It rejects further
//! submissions, then blocks until every driver has observed its queue empty,
//! cancelled itself, left the registry and returned its permit. It must not
//! be called from a thread that drives host ticks, or it will wait forever.
//!
//! Dropping an executor without closing it abandons whatever is still queued:
//! drivers cancel themselves on their next firing and the abandoned items'
//! results resolve as [`TaskError::Cancelled`].

mod budget;
mod lane;

pub use budget::{BudgetScope, TickBudget};

use self::lane::{Item, Lane};
use crate::config::ExecutorConfig;
use crate::error::{ConfigError, ScheduleError, TaskError};
use crate::scheduler::Platform;
use crate::sync::{OwnedSemaphorePermit, Semaphore};
use crate::task::{Deferred, Task, TaskHandle};
use crate::time::TimeSource;
use crate::tracing_compat::{debug, trace};
use crate::types::RegionKey;
use core::fmt;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

struct ExecInner {
    platform: Platform,
    config: ExecutorConfig,
    clock: Arc<dyn TimeSource>,
    budget: TickBudget,
    closed: AtomicBool,
    permits: Arc<Semaphore>,
    lanes: Mutex<HashMap<RegionKey, Arc<Lane>>>,
}

/// Batches work per region key under a per-tick wall-clock budget.
pub struct RegionExecutor {
    inner: Arc<ExecInner>,
}

impl RegionExecutor {
    /// Creates an executor submitting its drivers through `platform`.
    pub fn new(platform: &Platform, config: ExecutorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let permits = Arc::new(match config.max_active_keys {
            Some(max) => Semaphore::new(max),
            None => Semaphore::unbounded(),
        });
        let clock = platform.host().time_source();
        debug!(
            owner = %platform.owner(),
            ms_per_tick = config.ms_per_tick,
            max_active_keys = ?config.max_active_keys,
            scope = ?config.budget_scope,
            "region executor created"
        );
        Ok(Self {
            inner: Arc::new(ExecInner {
                platform: platform.clone(),
                budget: TickBudget::new(config.ms_per_tick, config.budget_scope),
                config,
                clock,
                closed: AtomicBool::new(false),
                permits,
                lanes: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// The executor configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    /// Queues `work` on `key`, blocking for a driver permit if the key has no
    /// driver and the cap is reached.
    ///
    /// A panic in `work` resolves the result as [`TaskError::Panicked`].
    pub fn queue<T, F>(&self, key: impl Into<RegionKey>, work: F) -> Result<Deferred<T>, ScheduleError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.submit(key.into(), true, move || Ok(work()))
    }

    /// Queues `work` on `key`; an `Err` resolves the result as
    /// [`TaskError::Failed`].
    pub fn queue_fallible<T, E, F>(
        &self,
        key: impl Into<RegionKey>,
        work: F,
    ) -> Result<Deferred<T>, ScheduleError>
    where
        T: Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.submit(key.into(), true, move || work().map_err(TaskError::failed))
    }

    /// Queues `work` on `key` and resolves the result with `value` once it
    /// has run.
    pub fn queue_with<T, F>(
        &self,
        key: impl Into<RegionKey>,
        work: F,
        value: T,
    ) -> Result<Deferred<T>, ScheduleError>
    where
        T: Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        self.submit(key.into(), true, move || {
            work();
            Ok(value)
        })
    }

    /// Like [`queue`](Self::queue), but fails with
    /// [`ScheduleError::Saturated`] instead of waiting for a permit.
    pub fn try_queue<T, F>(&self, key: impl Into<RegionKey>, work: F) -> Result<Deferred<T>, ScheduleError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.submit(key.into(), false, move || Ok(work()))
    }

    /// Rejects further submissions without waiting for drivers to drain.
    ///
    /// Returns false if the executor was already closing.
    pub fn begin_close(&self) -> bool {
        let first = !self.inner.closed.swap(true, Ordering::SeqCst);
        if first {
            debug!(
                active_keys = self.inner.lanes.lock().len(),
                "region executor closing"
            );
        }
        first
    }

    /// Closes the executor and blocks until every queued item has run and
    /// every driver has torn down.
    ///
    /// Never call this from a thread that drives host ticks.
    pub fn close(&self) {
        self.begin_close();
        self.inner.permits.wait_until_full();
        debug!("region executor drained");
    }

    /// Like [`close`](Self::close), giving up after `timeout`.
    ///
    /// Returns true if the executor fully drained.
    pub fn close_timeout(&self, timeout: Duration) -> bool {
        self.begin_close();
        let drained = self.inner.permits.wait_until_full_timeout(timeout);
        if drained {
            debug!("region executor drained");
        }
        drained
    }

    /// Whether [`begin_close`](Self::begin_close) or a close has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Keys that currently have a driver, in key order.
    #[must_use]
    pub fn active_keys(&self) -> Vec<RegionKey> {
        let mut keys: Vec<_> = self.inner.lanes.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Driver permits not held by any key.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.inner.permits.available_permits()
    }

    fn submit<T, F>(&self, key: RegionKey, block: bool, work: F) -> Result<Deferred<T>, ScheduleError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, TaskError> + Send + 'static,
    {
        if self.is_closed() {
            return Err(ScheduleError::ExecutorClosed);
        }
        let result = Deferred::new();
        let outcome = Outcome(result.clone());
        let item: Item = Box::new(move || {
            let resolved = catch_unwind(AssertUnwindSafe(work))
                .unwrap_or_else(|payload| Err(TaskError::from_panic(&*payload)));
            outcome.resolve(resolved);
        });

        let lane = self.lane(key, block)?;
        lane.push(item).map_err(|_| ScheduleError::ExecutorClosed)?;
        Ok(result)
    }

    /// Looks up the lane for `key`, materializing its driver if needed.
    ///
    /// Creation is serialized by the registry lock, so producers racing on
    /// one new key share a single permit and driver. A blocking caller that
    /// finds the cap reached waits for a permit to come back and then looks
    /// the key up again.
    fn lane(&self, key: RegionKey, block: bool) -> Result<Arc<Lane>, ScheduleError> {
        loop {
            {
                let mut lanes = self.inner.lanes.lock();
                if let Some(lane) = lanes.get(&key) {
                    return Ok(Arc::clone(lane));
                }
                if self.is_closed() {
                    return Err(ScheduleError::ExecutorClosed);
                }
                if let Ok(permit) = Semaphore::try_acquire_owned(&self.inner.permits, 1) {
                    let lane = self.start_driver(key.clone(), permit)?;
                    lanes.insert(key, Arc::clone(&lane));
                    return Ok(lane);
                }
                if !block {
                    return Err(ScheduleError::Saturated);
                }
            }
            self.inner.permits.wait_for_available(1);
        }
    }

    fn start_driver(&self, key: RegionKey, permit: OwnedSemaphorePermit) -> Result<Arc<Lane>, ScheduleError> {
        let lane = Arc::new(Lane::new(key.clone(), permit));
        let weak = Arc::downgrade(&self.inner);
        let driven = Arc::clone(&lane);
        self.inner.platform.region_scheduler().run_at_fixed_rate(
            key.clone(),
            move |handle| drive(&weak, &driven, handle),
            1,
            1,
        )?;
        debug!(key = %key, "region driver created");
        Ok(lane)
    }
}

/// One driver firing.
fn drive(executor: &Weak<ExecInner>, lane: &Lane, handle: &TaskHandle) {
    let Some(inner) = executor.upgrade() else {
        // Dropping an item resolves its result as cancelled.
        while lane.pop().is_some() {}
        handle.cancel();
        return;
    };

    let epoch = inner.platform.host().current_tick();
    let deadline = inner.budget.deadline(epoch, inner.clock.now());
    while inner.clock.now() < deadline {
        let Some(item) = lane.pop() else {
            break;
        };
        item();
    }
    trace!(key = %lane.key(), epoch, remaining = lane.len(), "region driver fired");

    if inner.closed.load(Ordering::SeqCst) {
        if let Some(permit) = lane.seal_if_empty() {
            handle.cancel();
            inner.lanes.lock().remove(lane.key());
            drop(permit);
            debug!(key = %lane.key(), "region driver torn down");
        }
    }
}

/// The result side of a queued item.
///
/// An item dropped without running, whether discarded by an orphaned driver
/// or released with its lane by the host, resolves as cancelled.
struct Outcome<T>(Deferred<T>);

impl<T> Outcome<T> {
    fn resolve(&self, outcome: Result<T, TaskError>) {
        self.0.resolve(outcome);
    }
}

impl<T> Drop for Outcome<T> {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

impl fmt::Debug for RegionExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lanes = self.inner.lanes.lock();
        f.debug_struct("RegionExecutor")
            .field("config", &self.inner.config)
            .field("closed", &self.is_closed())
            .field("active_keys", &lanes.len())
            .field("queued", &lanes.values().map(|lane| lane.len()).sum::<usize>())
            .finish_non_exhaustive()
    }
}
