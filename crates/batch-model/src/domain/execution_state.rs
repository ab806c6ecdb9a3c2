use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of one execution record.
///
/// `Pending -> Running -> {Succeeded | Failed | Aborted}`; no transition skips `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionState {
    /// Allocated, script not started yet.
    Pending,
    /// Script invocation started.
    Running,
    /// Script finished successfully.
    Succeeded,
    /// Script failed (non-zero exit, spawn error).
    Failed,
    /// Execution was cancelled by the environment.
    Aborted,
}

impl ExecutionState {
    /// Returns `true` if the record will not transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Succeeded | ExecutionState::Failed | ExecutionState::Aborted
        )
    }

    /// Returns `true` if `self -> next` is a legal forward step.
    pub fn can_transition_to(&self, next: ExecutionState) -> bool {
        match (self, next) {
            (ExecutionState::Pending, ExecutionState::Running) => true,
            (ExecutionState::Running, next) => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Pending => "pending",
            ExecutionState::Running => "running",
            ExecutionState::Succeeded => "succeeded",
            ExecutionState::Failed => "failed",
            ExecutionState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown execution state: {0}")]
pub struct ParseStateError(String);

impl FromStr for ExecutionState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ExecutionState::Pending),
            "running" => Ok(ExecutionState::Running),
            "succeeded" => Ok(ExecutionState::Succeeded),
            "failed" => Ok(ExecutionState::Failed),
            "aborted" => Ok(ExecutionState::Aborted),
            _ => Err(ParseStateError(s.to_string())),
        }
    }
}
