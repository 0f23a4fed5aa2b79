//! Consumer loop state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::CallbackResult;

/// Consumer loop state.
///
/// State transitions:
/// - Running -> Running (timeout, Ack, Requeue, discard)
/// - Running -> StopRequested (callback returned Stop, or a shutdown request was seen)
/// - StopRequested -> Stopped (the current iteration finished; no further pop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsumerState {
    Running,
    StopRequested,
    Stopped,
}

impl ConsumerState {
    /// State after the callback answered for one item.
    pub fn after_result(self, result: CallbackResult) -> Self {
        match (self, result) {
            (ConsumerState::Running, CallbackResult::Stop) => ConsumerState::StopRequested,
            (state, _) => state,
        }
    }

    /// State after the once-per-iteration shutdown check.
    pub fn after_shutdown_check(self, stop_requested: bool) -> Self {
        match self {
            ConsumerState::Running if stop_requested => ConsumerState::StopRequested,
            state => state,
        }
    }

    /// State at the iteration boundary: a pending stop becomes final.
    pub fn end_iteration(self) -> Self {
        match self {
            ConsumerState::StopRequested => ConsumerState::Stopped,
            state => state,
        }
    }

    /// Is the loop allowed to issue another pop?
    pub fn can_pop(self) -> bool {
        matches!(self, ConsumerState::Running)
    }
}

/// Why the consume loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopCause {
    /// An OS termination signal (name such as `SIGTERM`).
    Signal(String),

    /// The callback returned `Stop` while handling the named task.
    Callback { task_name: String },

    /// `Shutdown::request_stop` was called directly.
    Requested,
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCause::Signal(name) => write!(f, "signal {name}"),
            StopCause::Callback { task_name } => write!(f, "callback stop (task={task_name})"),
            StopCause::Requested => f.write_str("stop requested"),
        }
    }
}
