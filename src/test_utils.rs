//! Test utilities for tickplex.
//!
//! Shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Lab platform constructors
//!
//! # Example
//! ```
//! use tickplex::test_utils::{init_test_logging, lab_platform};
//! use tickplex::LabConfig;
//!
//! init_test_logging();
//! let (host, platform) = lab_platform(LabConfig::paper_like());
//! let task = platform.global_scheduler().execute(|| {}).expect("submit");
//! host.tick();
//! assert!(task.result().is_done());
//! ```

use crate::lab::LabHost;
use crate::scheduler::Platform;
use crate::config::LabConfig;
use crate::time::VirtualClock;
use crate::types::{Owner, WorldId};
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Owner name used by test platforms.
pub const TEST_OWNER: &str = "tickplex-test";

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// The world every test region lives in.
#[must_use]
pub fn test_world() -> WorldId {
    WorldId::new("test-world")
}

/// Builds a lab host and a platform negotiated against it.
#[must_use]
pub fn lab_platform(config: LabConfig) -> (Arc<LabHost>, Platform) {
    let host = Arc::new(LabHost::new(config));
    let platform = Platform::new(Owner::new(TEST_OWNER), host.clone())
        .expect("lab host capabilities are always supported");
    (host, platform)
}

/// Builds a lab host driven by a virtual clock, plus its platform.
#[must_use]
pub fn lab_platform_with_clock(
    config: LabConfig,
) -> (Arc<LabHost>, Platform, Arc<VirtualClock>) {
    let clock = Arc::new(VirtualClock::new());
    let host = Arc::new(LabHost::with_clock(config, clock.clone()));
    let platform = Platform::new(Owner::new(TEST_OWNER), host.clone())
        .expect("lab host capabilities are always supported");
    (host, platform, clock)
}

/// Log a test phase banner.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
