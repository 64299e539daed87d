//! Scheduling on the global tick context.

use super::{Platform, tick_delay, tick_period};
use crate::error::ScheduleError;
use crate::host::Binding;
use crate::task::{CompletableTask, TaskHandle};

/// Submits work to the single global context, which always exists.
#[derive(Debug, Clone)]
pub struct GlobalScheduler {
    platform: Platform,
}

impl GlobalScheduler {
    pub(crate) fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Runs `function` on the next tick.
    pub fn run<R, F>(&self, function: F) -> Result<CompletableTask<R>, ScheduleError>
    where
        R: Send + 'static,
        F: FnOnce(&CompletableTask<R>) -> R + Send + 'static,
    {
        self.run_delayed(function, 1)
    }

    /// Runs `function` after `delay` ticks (at least 1).
    pub fn run_delayed<R, F>(
        &self,
        function: F,
        delay: u64,
    ) -> Result<CompletableTask<R>, ScheduleError>
    where
        R: Send + 'static,
        F: FnOnce(&CompletableTask<R>) -> R + Send + 'static,
    {
        self.platform
            .submit_once(Binding::Global, tick_delay(delay)?, function)
    }

    /// Runs `body` after `initial` ticks, then every `period` ticks.
    pub fn run_at_fixed_rate<F>(
        &self,
        body: F,
        initial: u64,
        period: u64,
    ) -> Result<TaskHandle, ScheduleError>
    where
        F: FnMut(&TaskHandle) + Send + 'static,
    {
        self.platform.submit_repeating(
            Binding::Global,
            tick_delay(initial)?,
            tick_period(period)?,
            body,
        )
    }

    /// Runs `work` on the next tick.
    pub fn execute<F>(&self, work: F) -> Result<CompletableTask<()>, ScheduleError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.run(move |_| work())
    }

    /// Runs `work` after `delay` ticks.
    pub fn execute_delayed<F>(&self, work: F, delay: u64) -> Result<CompletableTask<()>, ScheduleError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.run_delayed(move |_| work(), delay)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::LabConfig;
    use crate::lab::LabContext;
    use crate::task::Task;
    use crate::test_utils::lab_platform;
    use crate::types::ExecutionState;
    use crate::{LabHost, ScheduleError};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn run_resolves_on_next_tick_in_global_context() {
        init_test("run_resolves_on_next_tick_in_global_context");
        let (host, platform) = lab_platform(LabConfig::paper_like());
        let task = platform
            .global_scheduler()
            .run(|task| {
                assert_eq!(task.execution_state(), ExecutionState::Running);
                LabHost::current_context()
            })
            .expect("submit");
        let done = task.result().is_done();
        crate::assert_with_log!(!done, "pending before tick", false, done);
        host.tick();
        let context = task.result().try_get().and_then(Result::ok);
        crate::assert_with_log!(
            context == Some(Some(LabContext::Global)),
            "ran on global context",
            Some(Some(LabContext::Global)),
            context
        );
        crate::test_complete!("run_resolves_on_next_tick_in_global_context");
    }

    #[test]
    fn zero_delay_is_rejected() {
        init_test("zero_delay_is_rejected");
        let (host, platform) = lab_platform(LabConfig::spigot_like());
        let err = platform.global_scheduler().execute_delayed(|| {}, 0).err();
        crate::assert_with_log!(
            err == Some(ScheduleError::InvalidDelay { delay: 0 }),
            "zero delay rejected",
            Some(ScheduleError::InvalidDelay { delay: 0 }),
            err
        );
        let pending = host.pending();
        crate::assert_with_log!(pending == 0, "nothing submitted", 0, pending);
        crate::test_complete!("zero_delay_is_rejected");
    }

    #[test]
    fn fixed_rate_body_can_cancel_itself() {
        init_test("fixed_rate_body_can_cancel_itself");
        let (host, platform) = lab_platform(LabConfig::spigot_like());
        let firings = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&firings);
        let handle = platform
            .global_scheduler()
            .run_at_fixed_rate(
                move |task| {
                    if counter.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                        task.cancel();
                    }
                },
                1,
                1,
            )
            .expect("submit");
        host.run_ticks(10);
        let fired = firings.load(Ordering::SeqCst);
        crate::assert_with_log!(fired == 3, "stopped after third firing", 3, fired);
        let state = handle.execution_state();
        crate::assert_with_log!(
            state == ExecutionState::Cancelled,
            "cancelled",
            ExecutionState::Cancelled,
            state
        );
        crate::test_complete!("fixed_rate_body_can_cancel_itself");
    }

    #[test]
    fn cancelled_before_fire_never_runs() {
        init_test("cancelled_before_fire_never_runs");
        let (host, platform) = lab_platform(LabConfig::paper_like());
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let task = platform
            .global_scheduler()
            .execute_delayed(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
                2,
            )
            .expect("submit");
        task.cancel();
        host.run_ticks(3);
        let ran = ran.load(Ordering::SeqCst);
        crate::assert_with_log!(ran == 0, "body skipped", 0, ran);
        let cancelled = task.result().is_cancelled();
        crate::assert_with_log!(cancelled, "result cancelled", true, cancelled);
        let pending = host.pending();
        crate::assert_with_log!(pending == 0, "native cancelled", 0, pending);
        crate::test_complete!("cancelled_before_fire_never_runs");
    }
}
