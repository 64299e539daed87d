//! Error types.
//!
//! Three families, matching the three ways work can fail to happen:
//!
//! - [`ScheduleError`]: a submission was rejected synchronously. No task
//!   exists for it.
//! - [`TaskError`]: a deferred result resolved exceptionally (cancelled, the
//!   body panicked, or the body returned an error).
//! - [`ConfigError`]: invalid configuration or an unsupported host, reported
//!   before any scheduling is attempted.
//!
//! Double cancellation and double completion are not errors; they surface as
//! the `*Already` variants of [`CancelledState`](crate::types::CancelledState).

use crate::host::Delay;
use std::sync::Arc;
use thiserror::Error as ThisError;

/// A submission rejected at call time.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ScheduleError {
    /// The region executor is closed or closing.
    #[error("executor is closed")]
    ExecutorClosed,
    /// A non-blocking submission could not obtain a driver permit.
    #[error("executor is saturated: no driver permit available")]
    Saturated,
    /// A tick-bound delay must be at least one tick.
    #[error("invalid delay: {delay} ticks (must be at least 1)")]
    InvalidDelay {
        /// The rejected delay.
        delay: u64,
    },
    /// A repeating period must be positive.
    #[error("invalid period: {period} (must be positive)")]
    InvalidPeriod {
        /// The rejected period.
        period: Delay,
    },
    /// The host no longer accepts submissions.
    #[error("tick host has shut down")]
    HostShutdown,
    /// The entity the task would be bound to is no longer valid.
    #[error("entity is no longer valid")]
    EntityRetired,
}

/// Exceptional resolution of a deferred result.
#[derive(Debug, Clone, ThisError)]
pub enum TaskError {
    /// The task was cancelled before it produced a value.
    #[error("task was cancelled")]
    Cancelled,
    /// The body panicked; carries the panic message when it was a string.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The body returned an error.
    #[error("task failed: {0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    /// Wraps an error returned by a work body.
    pub fn failed<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Failed(Arc::new(err))
    }

    /// Builds a [`TaskError::Panicked`] from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked(message)
    }

    /// Returns true if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if the body panicked.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

/// Invalid configuration or host.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ConfigError {
    /// `ms_per_tick` must be at least 1.
    #[error("ms_per_tick must be at least 1, got {0}")]
    InvalidMsPerTick(u64),
    /// `max_active_keys` must be at least 1 when set.
    #[error("max_active_keys must be at least 1 when set")]
    InvalidMaxActiveKeys,
    /// The owner name must not be empty.
    #[error("owner name must not be empty")]
    InvalidOwner,
    /// The lab host's tick length must be at least 1 ms.
    #[error("lab ms_per_tick must be at least 1, got {0}")]
    InvalidMsPerHostTick(u64),
    /// The host's capabilities cannot be served.
    #[error("unsupported host: {reason}")]
    UnsupportedHost {
        /// Why the host was rejected.
        reason: String,
    },
    /// A configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    /// A configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(String),
}

/// Crate-level error.
#[derive(Debug, Clone, ThisError)]
pub enum Error {
    /// A submission was rejected.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    /// A deferred result resolved exceptionally.
    #[error(transparent)]
    Task(#[from] TaskError),
    /// Configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Crate-level result alias.
pub type Result<T> = core::result::Result<T, Error>;
