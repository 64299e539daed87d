//! Per-tick wall-clock budget for region drivers.
//!
//! A driver asks [`TickBudget::deadline`] for its deadline at the start of
//! each firing, passing the host tick number as an epoch token. The first
//! request in an epoch fixes `now + ms_per_tick`; later requests in the same
//! epoch get the cached deadline, according to the [`BudgetScope`].

use crate::types::Time;
use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::thread::{self, ThreadId};

/// Which driver firings share one deadline within a host tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetScope {
    /// Every driver firing in the same host tick shares one deadline,
    /// whichever thread it runs on.
    SharedPerTick,
    /// Drivers firing on the same thread in the same host tick share one
    /// deadline; each thread gets its own.
    #[default]
    PerThread,
    /// Every driver firing gets a fresh budget.
    PerFiring,
}

/// Deadline cache keyed by host tick.
#[derive(Debug)]
pub struct TickBudget {
    ms_per_tick: u64,
    scope: BudgetScope,
    shared: Mutex<Option<(u64, Time)>>,
    per_thread: Mutex<HashMap<ThreadId, (u64, Time)>>,
}

impl TickBudget {
    /// Creates a budget of `ms_per_tick` milliseconds.
    #[must_use]
    pub fn new(ms_per_tick: u64, scope: BudgetScope) -> Self {
        Self {
            ms_per_tick,
            scope,
            shared: Mutex::new(None),
            per_thread: Mutex::new(HashMap::new()),
        }
    }

    /// The budget length.
    #[must_use]
    pub fn ms_per_tick(&self) -> u64 {
        self.ms_per_tick
    }

    /// The sharing scope.
    #[must_use]
    pub fn scope(&self) -> BudgetScope {
        self.scope
    }

    /// The deadline for a firing in host tick `epoch` starting at `now`.
    pub fn deadline(&self, epoch: u64, now: Time) -> Time {
        let fresh = now.saturating_add_millis(self.ms_per_tick);
        match self.scope {
            BudgetScope::PerFiring => fresh,
            BudgetScope::SharedPerTick => {
                let mut shared = self.shared.lock();
                match *shared {
                    Some((cached, deadline)) if cached == epoch => deadline,
                    _ => {
                        *shared = Some((epoch, fresh));
                        fresh
                    }
                }
            }
            BudgetScope::PerThread => {
                let thread = thread::current().id();
                let mut per_thread = self.per_thread.lock();
                if let Some(&(cached, deadline)) = per_thread.get(&thread) {
                    if cached == epoch {
                        return deadline;
                    }
                }
                per_thread.retain(|_, (cached, _)| *cached >= epoch);
                per_thread.insert(thread, (epoch, fresh));
                fresh
            }
        }
    }
}
