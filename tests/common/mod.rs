#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tickplex::{LabHost, RegionExecutor};

pub use tickplex::test_utils::{
    init_test_logging, lab_platform, lab_platform_with_clock, test_world,
};

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;
/// Default seed for shuffled workloads.
pub const DEFAULT_SHUFFLE_SEED: u64 = 0x7105_9EED;

const PROPTEST_SEED_ENV: &str = "TICKPLEX_PROPTEST_SEED";
const SHUFFLE_SEED_ENV: &str = "TICKPLEX_SHUFFLE_SEED";

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = read_proptest_seed() {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }
    None
}

/// Seeded RNG for shuffled workloads; `TICKPLEX_SHUFFLE_SEED` overrides.
#[must_use]
pub fn shuffle_rng() -> fastrand::Rng {
    let seed = std::env::var(SHUFFLE_SEED_ENV)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(DEFAULT_SHUFFLE_SEED);
    tracing::debug!(seed, "shuffle seed");
    fastrand::Rng::with_seed(seed)
}

/// Closes `executor` on a helper thread while this thread drives `host`.
///
/// Panics if the close has not returned within `limit`.
pub fn close_while_ticking(host: &LabHost, executor: &RegionExecutor, limit: Duration) -> u64 {
    let started = Instant::now();
    std::thread::scope(|s| {
        let closer = s.spawn(|| executor.close());
        let mut ticks = 0;
        while !closer.is_finished() {
            assert!(
                started.elapsed() < limit,
                "close did not return within {limit:?}"
            );
            host.tick();
            ticks += 1;
            std::thread::yield_now();
        }
        closer.join().expect("closer thread panicked");
        ticks
    })
}
