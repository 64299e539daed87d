//! Platform negotiation and the four scheduler surfaces.
//!
//! A [`Platform`] is built once per owner against a [`TickHost`]. It reads the
//! host's [`HostCapabilities`] a single time and resolves them into a
//! [`SchedulingStrategy`]; every façade consults that strategy rather than
//! probing the host per call.
//!
//! | Façade | Binds to | Delay unit |
//! |---|---|---|
//! | [`GlobalScheduler`] | the global tick context | ticks (≥ 1) |
//! | [`AsyncScheduler`] | any async worker | [`Duration`](std::time::Duration) |
//! | [`RegionScheduler`] | the context owning a region | ticks (≥ 1) |
//! | [`EntityScheduler`] | the context owning an entity | ticks (≥ 1) |
//!
//! All façades share one construction idiom: the task exists before the host
//! sees the work, the work closes over a clone of the task, and the host's
//! native handle is bound into the task once the submission is accepted.

pub mod async_scheduler;
pub mod entity;
pub mod global;
pub mod region;

pub use async_scheduler::AsyncScheduler;
pub use entity::EntityScheduler;
pub use global::GlobalScheduler;
pub use region::RegionScheduler;

use crate::config::{ExecutorConfig, PlatformConfig};
use crate::error::{ConfigError, ScheduleError};
use crate::executor::RegionExecutor;
use crate::host::{Binding, Delay, HostCapabilities, HostWork, TickHost, Timing};
use crate::task::{CompletableTask, TaskCore, TaskHandle};
use crate::tracing_compat::{debug, trace};
use crate::types::Owner;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How region-bound work reaches the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionBinding {
    /// Submitted as [`Binding::Region`].
    Native,
    /// The host has no region scheduler; submitted as [`Binding::Global`].
    Global,
}

/// How entity-bound work reaches the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityBinding {
    /// Submitted as [`Binding::Entity`]; the host reports retirement.
    Native,
    /// Submitted to the global context; liveness is checked before each
    /// firing and retirement is performed by the façade.
    Emulated,
}

/// The scheduling strategy resolved from a host's capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchedulingStrategy {
    /// Region binding.
    pub region: RegionBinding,
    /// Entity binding.
    pub entity: EntityBinding,
}

impl SchedulingStrategy {
    /// Resolves a strategy, rejecting hosts that cannot be served.
    ///
    /// A regionized host has no global thread to emulate region or entity
    /// binding on, so it must support both natively.
    pub fn negotiate(capabilities: HostCapabilities) -> Result<Self, ConfigError> {
        if capabilities.regionized && !capabilities.native_region_scheduling {
            return Err(ConfigError::UnsupportedHost {
                reason: "regionized host without native region scheduling".to_string(),
            });
        }
        if capabilities.regionized && !capabilities.native_entity_scheduling {
            return Err(ConfigError::UnsupportedHost {
                reason: "regionized host without native entity scheduling".to_string(),
            });
        }
        Ok(Self {
            region: if capabilities.native_region_scheduling {
                RegionBinding::Native
            } else {
                RegionBinding::Global
            },
            entity: if capabilities.native_entity_scheduling {
                EntityBinding::Native
            } else {
                EntityBinding::Emulated
            },
        })
    }
}

struct PlatformInner {
    owner: Owner,
    host: Arc<dyn TickHost>,
    capabilities: HostCapabilities,
    strategy: SchedulingStrategy,
}

/// One owner's view of a tick host.
///
/// Cheap to clone; all clones share the negotiated strategy.
#[derive(Clone)]
pub struct Platform {
    inner: Arc<PlatformInner>,
}

impl Platform {
    /// Negotiates with `host` on behalf of `owner`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnsupportedHost`] if the host's capabilities cannot be
    /// served. Nothing has been scheduled when this fails.
    pub fn new(owner: Owner, host: Arc<dyn TickHost>) -> Result<Self, ConfigError> {
        let capabilities = host.capabilities();
        let strategy = SchedulingStrategy::negotiate(capabilities)?;
        debug!(
            owner = %owner,
            ?capabilities,
            ?strategy,
            "negotiated scheduling strategy"
        );
        Ok(Self {
            inner: Arc::new(PlatformInner {
                owner,
                host,
                capabilities,
                strategy,
            }),
        })
    }

    /// Validates `config` and negotiates with `host`.
    pub fn from_config(config: &PlatformConfig, host: Arc<dyn TickHost>) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(Owner::new(&config.owner), host)
    }

    /// The owner attached to every task.
    #[must_use]
    pub fn owner(&self) -> &Owner {
        &self.inner.owner
    }

    /// The host.
    #[must_use]
    pub fn host(&self) -> &Arc<dyn TickHost> {
        &self.inner.host
    }

    /// Capabilities as reported at negotiation time.
    #[must_use]
    pub fn capabilities(&self) -> HostCapabilities {
        self.inner.capabilities
    }

    /// The negotiated strategy.
    #[must_use]
    pub fn strategy(&self) -> SchedulingStrategy {
        self.inner.strategy
    }

    /// Work not bound to any tick context.
    #[must_use]
    pub fn async_scheduler(&self) -> AsyncScheduler {
        AsyncScheduler::new(self.clone())
    }

    /// Work on the global tick context.
    #[must_use]
    pub fn global_scheduler(&self) -> GlobalScheduler {
        GlobalScheduler::new(self.clone())
    }

    /// Work on the context owning a region.
    #[must_use]
    pub fn region_scheduler(&self) -> RegionScheduler {
        RegionScheduler::new(self.clone())
    }

    /// Work on the context owning an entity.
    #[must_use]
    pub fn entity_scheduler(&self) -> EntityScheduler {
        EntityScheduler::new(self.clone())
    }

    /// Creates a region executor on this platform.
    pub fn region_executor(&self, config: ExecutorConfig) -> Result<RegionExecutor, ConfigError> {
        RegionExecutor::new(self, config)
    }

    /// Submits `work` and binds the returned native handle into `core`.
    pub(crate) fn bind(
        &self,
        core: &TaskCore,
        binding: Binding,
        timing: Timing,
        work: HostWork,
    ) -> Result<(), ScheduleError> {
        let native = self.inner.host.submit(&self.inner.owner, binding, timing, work)?;
        core.bind_native(native);
        Ok(())
    }

    /// Submits a one-shot body that receives its own task.
    pub(crate) fn submit_once<R, F>(
        &self,
        binding: Binding,
        delay: Delay,
        function: F,
    ) -> Result<CompletableTask<R>, ScheduleError>
    where
        R: Send + 'static,
        F: FnOnce(&CompletableTask<R>) -> R + Send + 'static,
    {
        let task = CompletableTask::new(self.owner().clone(), binding.is_async());
        let work = completion_work(task.clone(), function);
        self.bind(task.core(), binding, Timing::Once { delay }, work)?;
        Ok(task)
    }

    /// Submits a repeating body that receives its own task.
    pub(crate) fn submit_repeating<F>(
        &self,
        binding: Binding,
        initial: Delay,
        period: Delay,
        body: F,
    ) -> Result<TaskHandle, ScheduleError>
    where
        F: FnMut(&TaskHandle) + Send + 'static,
    {
        if period.is_zero() {
            return Err(ScheduleError::InvalidPeriod { period });
        }
        let handle = TaskHandle::new(TaskCore::new(
            self.owner().clone(),
            true,
            binding.is_async(),
        ));
        let work = repeating_work(handle.clone(), body);
        self.bind(handle.core(), binding, Timing::Repeating { initial, period }, work)?;
        Ok(handle)
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("owner", &self.inner.owner)
            .field("capabilities", &self.inner.capabilities)
            .field("strategy", &self.inner.strategy)
            .finish_non_exhaustive()
    }
}

/// Host work that completes `task` with `function` on its single firing.
///
/// If the host drops the work without firing it, the task settles to
/// `Cancelled` and its result resolves as cancelled.
pub(crate) fn completion_work<R, F>(task: CompletableTask<R>, function: F) -> HostWork
where
    R: Send + 'static,
    F: FnOnce(&CompletableTask<R>) -> R + Send + 'static,
{
    let mut completion = Completion {
        task,
        function: Some(function),
    };
    Box::new(move || completion.fire())
}

/// Host work that runs `body` through the handle's state machine each firing.
///
/// If the host drops the work, an idle handle settles to `Cancelled`.
pub(crate) fn repeating_work<F>(handle: TaskHandle, body: F) -> HostWork
where
    F: FnMut(&TaskHandle) + Send + 'static,
{
    let mut repeating = Repeating { handle, body };
    Box::new(move || repeating.fire())
}

struct Completion<R, F> {
    task: CompletableTask<R>,
    function: Option<F>,
}

impl<R, F: FnOnce(&CompletableTask<R>) -> R> Completion<R, F> {
    fn fire(&mut self) {
        if let Some(function) = self.function.take() {
            self.task.complete(function);
        }
    }
}

impl<R, F> Drop for Completion<R, F> {
    fn drop(&mut self) {
        if self.function.is_some() && self.task.retire() {
            trace!(task = ?self.task.core().id(), "host dropped unfired task");
        }
    }
}

struct Repeating<F> {
    handle: TaskHandle,
    body: F,
}

impl<F: FnMut(&TaskHandle)> Repeating<F> {
    fn fire(&mut self) {
        let Self { handle, body } = self;
        let handle: &TaskHandle = handle;
        handle.core().run(|| body(handle));
    }
}

impl<F> Drop for Repeating<F> {
    fn drop(&mut self) {
        if self.handle.core().retire() {
            trace!(task = ?self.handle.core().id(), "host dropped repeating task");
        }
    }
}

/// A tick delay; zero is rejected.
pub(crate) fn tick_delay(ticks: u64) -> Result<Delay, ScheduleError> {
    if ticks == 0 {
        Err(ScheduleError::InvalidDelay { delay: ticks })
    } else {
        Ok(Delay::Ticks(ticks))
    }
}

/// A tick period; zero is rejected.
pub(crate) fn tick_period(ticks: u64) -> Result<Delay, ScheduleError> {
    if ticks == 0 {
        Err(ScheduleError::InvalidPeriod {
            period: Delay::Ticks(ticks),
        })
    } else {
        Ok(Delay::Ticks(ticks))
    }
}
