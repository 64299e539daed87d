//! Scheduling off the tick contexts.

use super::Platform;
use crate::error::ScheduleError;
use crate::host::{Binding, Delay};
use crate::task::{CompletableTask, TaskHandle};
use std::time::Duration;

/// Submits work to async workers. Delays are wall-clock durations; the host
/// converts them to ticks. A zero delay means "as soon as a worker is free".
#[derive(Debug, Clone)]
pub struct AsyncScheduler {
    platform: Platform,
}

impl AsyncScheduler {
    pub(crate) fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Runs `function` as soon as possible.
    pub fn run<R, F>(&self, function: F) -> Result<CompletableTask<R>, ScheduleError>
    where
        R: Send + 'static,
        F: FnOnce(&CompletableTask<R>) -> R + Send + 'static,
    {
        self.run_delayed(function, Duration::ZERO)
    }

    /// Runs `function` after `delay`.
    pub fn run_delayed<R, F>(
        &self,
        function: F,
        delay: Duration,
    ) -> Result<CompletableTask<R>, ScheduleError>
    where
        R: Send + 'static,
        F: FnOnce(&CompletableTask<R>) -> R + Send + 'static,
    {
        self.platform
            .submit_once(Binding::Async, Delay::Wall(delay), function)
    }

    /// Runs `body` after `initial`, then every `period` (which must be
    /// positive).
    pub fn run_at_fixed_rate<F>(
        &self,
        body: F,
        initial: Duration,
        period: Duration,
    ) -> Result<TaskHandle, ScheduleError>
    where
        F: FnMut(&TaskHandle) + Send + 'static,
    {
        self.platform.submit_repeating(
            Binding::Async,
            Delay::Wall(initial),
            Delay::Wall(period),
            body,
        )
    }

    /// Runs `work` as soon as possible.
    pub fn execute<F>(&self, work: F) -> Result<CompletableTask<()>, ScheduleError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.run(move |_| work())
    }

    /// Runs `work` after `delay`.
    pub fn execute_delayed<F>(
        &self,
        work: F,
        delay: Duration,
    ) -> Result<CompletableTask<()>, ScheduleError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.run_delayed(move |_| work(), delay)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::LabConfig;
    use crate::host::Delay;
    use crate::lab::{LabContext, LabHost};
    use crate::task::Task;
    use crate::test_utils::lab_platform;
    use crate::ScheduleError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn async_tasks_are_flagged_and_run_on_async_context() {
        init_test("async_tasks_are_flagged_and_run_on_async_context");
        let (host, platform) = lab_platform(LabConfig::spigot_like());
        let task = platform
            .async_scheduler()
            .run(|_| LabHost::current_context())
            .expect("submit");
        crate::assert_with_log!(task.is_async(), "async flag", true, task.is_async());
        host.tick();
        let context = task.result().try_get().and_then(Result::ok);
        crate::assert_with_log!(
            context == Some(Some(LabContext::Async)),
            "ran on async context",
            Some(Some(LabContext::Async)),
            context
        );
        crate::test_complete!("async_tasks_are_flagged_and_run_on_async_context");
    }

    #[test]
    fn wall_delay_is_converted_by_host() {
        init_test("wall_delay_is_converted_by_host");
        // 50ms ticks: 250ms is five ticks.
        let (host, platform) = lab_platform(LabConfig::spigot_like());
        let task = platform
            .async_scheduler()
            .execute_delayed(|| {}, Duration::from_millis(250))
            .expect("submit");
        host.run_ticks(4);
        let early = task.result().is_done();
        crate::assert_with_log!(!early, "not after four ticks", false, early);
        host.tick();
        let done = task.result().is_done();
        crate::assert_with_log!(done, "done after five", true, done);
        crate::test_complete!("wall_delay_is_converted_by_host");
    }

    #[test]
    fn fixed_rate_rejects_zero_period() {
        init_test("fixed_rate_rejects_zero_period");
        let (_host, platform) = lab_platform(LabConfig::spigot_like());
        let err = platform
            .async_scheduler()
            .run_at_fixed_rate(|_| {}, Duration::ZERO, Duration::ZERO)
            .err();
        let expected = Some(ScheduleError::InvalidPeriod {
            period: Delay::Wall(Duration::ZERO),
        });
        crate::assert_with_log!(err == expected, "zero period rejected", expected, err);
        crate::test_complete!("fixed_rate_rejects_zero_period");
    }

    #[test]
    fn fixed_rate_repeats_until_cancelled() {
        init_test("fixed_rate_repeats_until_cancelled");
        let (host, platform) = lab_platform(LabConfig::spigot_like());
        let firings = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&firings);
        let handle = platform
            .async_scheduler()
            .run_at_fixed_rate(
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
                Duration::ZERO,
                Duration::from_millis(100),
            )
            .expect("submit");
        host.run_ticks(5);
        let fired = firings.load(Ordering::SeqCst);
        // Fires on ticks 1, 3 and 5.
        crate::assert_with_log!(fired == 3, "every two ticks", 3, fired);
        handle.cancel();
        host.run_ticks(4);
        let after = firings.load(Ordering::SeqCst);
        crate::assert_with_log!(after == 3, "stopped", 3, after);
        crate::test_complete!("fixed_rate_repeats_until_cancelled");
    }
}
