//! Scheduling on the context owning a region.

use super::{Platform, RegionBinding, tick_delay, tick_period};
use crate::error::ScheduleError;
use crate::host::Binding;
use crate::task::{CompletableTask, TaskHandle};
use crate::types::RegionKey;

/// Submits work to the context owning a region cell.
///
/// Keys are anything convertible to a [`RegionKey`]: a key itself, a
/// `(world, x, z)` tuple of region-grid coordinates, or a
/// [`BlockPos`](crate::types::BlockPos), which resolves to its cell by
/// shifting block coordinates right by 4.
///
/// On hosts without native region scheduling the work runs on the global
/// context instead.
#[derive(Debug, Clone)]
pub struct RegionScheduler {
    platform: Platform,
}

impl RegionScheduler {
    pub(crate) fn new(platform: Platform) -> Self {
        Self { platform }
    }

    fn binding(&self, key: RegionKey) -> Binding {
        match self.platform.strategy().region {
            RegionBinding::Native => Binding::Region(key),
            RegionBinding::Global => Binding::Global,
        }
    }

    /// Runs `function` on the next tick of the region's context.
    pub fn run<R, F>(
        &self,
        key: impl Into<RegionKey>,
        function: F,
    ) -> Result<CompletableTask<R>, ScheduleError>
    where
        R: Send + 'static,
        F: FnOnce(&CompletableTask<R>) -> R + Send + 'static,
    {
        self.run_delayed(key, function, 1)
    }

    /// Runs `function` after `delay` ticks (at least 1).
    pub fn run_delayed<R, F>(
        &self,
        key: impl Into<RegionKey>,
        function: F,
        delay: u64,
    ) -> Result<CompletableTask<R>, ScheduleError>
    where
        R: Send + 'static,
        F: FnOnce(&CompletableTask<R>) -> R + Send + 'static,
    {
        let delay = tick_delay(delay)?;
        self.platform
            .submit_once(self.binding(key.into()), delay, function)
    }

    /// Runs `body` after `initial` ticks, then every `period` ticks.
    pub fn run_at_fixed_rate<F>(
        &self,
        key: impl Into<RegionKey>,
        body: F,
        initial: u64,
        period: u64,
    ) -> Result<TaskHandle, ScheduleError>
    where
        F: FnMut(&TaskHandle) + Send + 'static,
    {
        let initial = tick_delay(initial)?;
        let period = tick_period(period)?;
        self.platform
            .submit_repeating(self.binding(key.into()), initial, period, body)
    }

    /// Runs `work` on the next tick of the region's context.
    pub fn execute<F>(
        &self,
        key: impl Into<RegionKey>,
        work: F,
    ) -> Result<CompletableTask<()>, ScheduleError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.run(key, move |_| work())
    }

    /// Runs `work` after `delay` ticks.
    pub fn execute_delayed<F>(
        &self,
        key: impl Into<RegionKey>,
        work: F,
        delay: u64,
    ) -> Result<CompletableTask<()>, ScheduleError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.run_delayed(key, move |_| work(), delay)
    }
}
