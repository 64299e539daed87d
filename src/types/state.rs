//! Task lifecycle states and cancellation outcomes.
//!
//! These enums re-express the fixed set of outcomes a tick host can report
//! for its native tasks. Every distinct outcome is preserved; `Running` and
//! `AlreadyExecuted` in particular are never collapsed.

use core::fmt;
use serde::{Deserialize, Serialize};

/// The current execution state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ExecutionState {
    /// Not executing, but may begin execution in the future.
    Idle = 0,
    /// Currently executing.
    Running = 1,
    /// A one-shot task that finished executing.
    Finished = 2,
    /// Not executing and will never execute again. A one-shot task in this
    /// state never executed.
    Cancelled = 3,
    /// A repeating task that is executing now, with all future executions
    /// cancelled.
    CancelledRunning = 4,
}

impl ExecutionState {
    /// Decodes a state stored in an atomic.
    ///
    /// Returns `None` for values that no state encodes to.
    #[inline]
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Idle),
            1 => Some(Self::Running),
            2 => Some(Self::Finished),
            3 => Some(Self::Cancelled),
            4 => Some(Self::CancelledRunning),
            _ => None,
        }
    }

    /// Encodes the state for atomic storage.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns true for `Cancelled` and `CancelledRunning`.
    #[must_use]
    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled | Self::CancelledRunning)
    }

    /// Returns true if no further execution can ever start.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// Returns true if a body is executing in this state.
    #[must_use]
    pub const fn is_executing(self) -> bool {
        matches!(self, Self::Running | Self::CancelledRunning)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Finished => write!(f, "finished"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::CancelledRunning => write!(f, "cancelled (running)"),
        }
    }
}

/// The result of a cancellation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledState {
    /// This caller cancelled the task. It is not executing and will never
    /// begin execution.
    CancelledByCaller,
    /// The task was already cancelled. It is not executing and will never
    /// begin execution.
    CancelledAlready,
    /// A one-shot task that could not be cancelled because it is executing.
    Running,
    /// A one-shot task that could not be cancelled because it already
    /// finished executing.
    AlreadyExecuted,
    /// This caller stopped future executions of a repeating task that is
    /// executing now.
    NextRunsCancelled,
    /// Future executions of the repeating task were already cancelled; it is
    /// executing now.
    NextRunsCancelledAlready,
}

impl CancelledState {
    /// Returns true if this particular call performed the cancellation.
    #[must_use]
    pub const fn is_by_caller(self) -> bool {
        matches!(self, Self::CancelledByCaller | Self::NextRunsCancelled)
    }

    /// Returns true if the task will never begin another execution.
    #[must_use]
    pub const fn stops_future_runs(self) -> bool {
        !matches!(self, Self::Running | Self::AlreadyExecuted)
    }

    /// Returns true for the idempotent "already" answers.
    #[must_use]
    pub const fn is_already(self) -> bool {
        matches!(
            self,
            Self::CancelledAlready | Self::NextRunsCancelledAlready | Self::AlreadyExecuted
        )
    }
}

impl fmt::Display for CancelledState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CancelledByCaller => write!(f, "cancelled by caller"),
            Self::CancelledAlready => write!(f, "already cancelled"),
            Self::Running => write!(f, "running"),
            Self::AlreadyExecuted => write!(f, "already executed"),
            Self::NextRunsCancelled => write!(f, "next runs cancelled"),
            Self::NextRunsCancelledAlready => write!(f, "next runs already cancelled"),
        }
    }
}
