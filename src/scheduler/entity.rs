//! Scheduling on the context owning an entity.
//!
//! An entity may disappear between submission and firing, so this façade has
//! two rejection paths:
//!
//! - **Synchronous**: the entity is already gone at submission. The call
//!   returns `Ok(None)` and nothing is scheduled.
//! - **Asynchronous**: the entity is gone when the task comes due. The task
//!   moves straight from `Idle` to `Cancelled` (never `Running`), a
//!   completable task's result resolves as cancelled, and the retired
//!   callback runs once, on the context that would have run the body.
//!
//! Retired callbacks run in a restricted context: they must not schedule
//! further work that depends on the entity.

use super::{EntityBinding, Platform, completion_work, repeating_work, tick_delay, tick_period};
use crate::error::ScheduleError;
use crate::host::{Binding, Entity, HostWork, Retired, Timing};
use crate::task::{CompletableTask, TaskCore, TaskHandle};
use std::sync::Arc;

/// Submits work bound to an entity.
#[derive(Debug, Clone)]
pub struct EntityScheduler {
    platform: Platform,
}

impl EntityScheduler {
    pub(crate) fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Runs `function` on the entity's next tick.
    ///
    /// Returns `Ok(None)` if the entity is already gone.
    pub fn run<R, F>(
        &self,
        entity: Arc<dyn Entity>,
        retired: Option<Retired>,
        function: F,
    ) -> Result<Option<CompletableTask<R>>, ScheduleError>
    where
        R: Send + 'static,
        F: FnOnce(&CompletableTask<R>) -> R + Send + 'static,
    {
        self.run_delayed(entity, retired, function, 1)
    }

    /// Runs `function` after `delay` ticks (at least 1).
    pub fn run_delayed<R, F>(
        &self,
        entity: Arc<dyn Entity>,
        retired: Option<Retired>,
        function: F,
        delay: u64,
    ) -> Result<Option<CompletableTask<R>>, ScheduleError>
    where
        R: Send + 'static,
        F: FnOnce(&CompletableTask<R>) -> R + Send + 'static,
    {
        let delay = tick_delay(delay)?;
        if !entity.is_valid() {
            return Ok(None);
        }
        let task = CompletableTask::new(self.platform.owner().clone(), false);
        let retiring = task.clone();
        let scheduled = self.submit(
            task.core(),
            entity,
            retired,
            Timing::Once { delay },
            move || retiring.retire(),
            completion_work(task.clone(), function),
        )?;
        Ok(scheduled.then_some(task))
    }

    /// Runs `body` after `initial` ticks, then every `period` ticks, for as
    /// long as the entity exists.
    pub fn run_at_fixed_rate<F>(
        &self,
        entity: Arc<dyn Entity>,
        retired: Option<Retired>,
        body: F,
        initial: u64,
        period: u64,
    ) -> Result<Option<TaskHandle>, ScheduleError>
    where
        F: FnMut(&TaskHandle) + Send + 'static,
    {
        let initial = tick_delay(initial)?;
        let period = tick_period(period)?;
        if !entity.is_valid() {
            return Ok(None);
        }
        let handle = TaskHandle::new(TaskCore::new(self.platform.owner().clone(), true, false));
        let retiring = handle.clone();
        let scheduled = self.submit(
            handle.core(),
            entity,
            retired,
            Timing::Repeating { initial, period },
            move || retiring.core().retire(),
            repeating_work(handle.clone(), body),
        )?;
        Ok(scheduled.then_some(handle))
    }

    /// Runs `work` on the entity's next tick.
    pub fn execute<F>(
        &self,
        entity: Arc<dyn Entity>,
        retired: Option<Retired>,
        work: F,
    ) -> Result<Option<CompletableTask<()>>, ScheduleError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.run(entity, retired, move |_| work())
    }

    /// Runs `work` after `delay` ticks.
    pub fn execute_delayed<F>(
        &self,
        entity: Arc<dyn Entity>,
        retired: Option<Retired>,
        work: F,
        delay: u64,
    ) -> Result<Option<CompletableTask<()>>, ScheduleError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.run_delayed(entity, retired, move |_| work(), delay)
    }

    /// Submits according to the negotiated entity strategy.
    ///
    /// Returns `Ok(false)` if the host reports the entity already gone.
    fn submit<C>(
        &self,
        core: &TaskCore,
        entity: Arc<dyn Entity>,
        retired: Option<Retired>,
        timing: Timing,
        retire: C,
        mut work: HostWork,
    ) -> Result<bool, ScheduleError>
    where
        C: Fn() -> bool + Send + 'static,
    {
        let outcome = match self.platform.strategy().entity {
            EntityBinding::Native => {
                let on_retired: Retired = Box::new(move || {
                    if retire() {
                        if let Some(retired) = retired {
                            retired();
                        }
                    }
                });
                self.platform.bind(
                    core,
                    Binding::Entity {
                        entity,
                        retired: on_retired,
                    },
                    timing,
                    work,
                )
            }
            EntityBinding::Emulated => {
                let mut retired = retired;
                let guarded: HostWork = Box::new(move || {
                    if entity.is_valid() {
                        work();
                    } else if retire() {
                        if let Some(retired) = retired.take() {
                            retired();
                        }
                    }
                });
                self.platform.bind(core, Binding::Global, timing, guarded)
            }
        };
        match outcome {
            Ok(()) => Ok(true),
            Err(ScheduleError::EntityRetired) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
