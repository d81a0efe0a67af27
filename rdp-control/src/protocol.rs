// Control errors and protocol error names
//
// Registry and session-protocol failures are returned as typed results;
// the command layer decides whether to report them as error packets.

use crate::types::{BreakpointId, SessionId};
use std::fmt;
use thiserror::Error;

pub type ControlResult<T> = Result<T, ControlError>;

/// Which state transition was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Resume requested while the debuggee is running
    NotPaused,
    /// A location hook fired while a pause is still active
    HookWhilePaused,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::NotPaused => f.write_str("debuggee is not paused"),
            Transition::HookWhilePaused => f.write_str("location hook fired while paused"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("No such breakpoint: {0}")]
    NotFound(BreakpointId),

    #[error("Invalid transition: {0}")]
    InvalidTransition(Transition),

    #[error("Pause session {0} already resumed")]
    AlreadyResumed(SessionId),

    #[error("Stack snapshot failed: {0}")]
    SnapshotFailure(#[from] SnapshotError),

    #[error("Debugger detached")]
    Detached,
}

impl ControlError {
    /// Error name used in protocol error packets
    pub fn wire_name(&self) -> &'static str {
        match self {
            ControlError::NotFound(_) => "noSuchActor",
            ControlError::InvalidTransition(_) => "wrongState",
            ControlError::AlreadyResumed(_) => "wrongState",
            ControlError::SnapshotFailure(_) => "unknownFrame",
            ControlError::Detached => "exited",
        }
    }
}

/// Stack capture failure reported by the debuggee
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SnapshotError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(ControlError::NotFound(BreakpointId(1)).wire_name(), "noSuchActor");
        assert_eq!(
            ControlError::InvalidTransition(Transition::NotPaused).wire_name(),
            "wrongState"
        );
        assert_eq!(ControlError::AlreadyResumed(SessionId(2)).wire_name(), "wrongState");
    }

    #[test]
    fn test_error_messages() {
        let err = ControlError::NotFound(BreakpointId(4));
        assert_eq!(err.to_string(), "No such breakpoint: bp4");

        let err: ControlError = SnapshotError("frame walk failed".to_string()).into();
        assert_eq!(err.to_string(), "Stack snapshot failed: frame walk failed");
    }
}
