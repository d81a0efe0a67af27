// Pause sessions
//
// A PauseSession exists from the moment the controller suspends the debuggee
// until it is resumed. Its frame snapshot is only valid while it is live.

use crate::condition::ConditionEvaluationError;
use crate::controller::Shared;
use crate::protocol::{ControlError, ControlResult};
use crate::types::{BreakpointId, ExceptionInfo, Frame, FrameSnapshot, SessionId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

/// Why execution suspended
#[derive(Debug, Clone, PartialEq)]
pub enum PauseReason {
    Breakpoint(BreakpointId),
    DebuggerStatement,
    Step,
    Exception(ExceptionInfo),
    ConditionThrew(BreakpointId, ConditionEvaluationError),
}

impl PauseReason {
    /// Protocol `why.type` tag
    pub fn tag(&self) -> &'static str {
        match self {
            PauseReason::Breakpoint(_) => "breakpoint",
            PauseReason::DebuggerStatement => "debuggerStatement",
            PauseReason::Step => "resumeLimit",
            PauseReason::Exception(_) => "exception",
            PauseReason::ConditionThrew(..) => "breakpointConditionThrown",
        }
    }

    pub fn breakpoint_id(&self) -> Option<BreakpointId> {
        match self {
            PauseReason::Breakpoint(id) | PauseReason::ConditionThrew(id, _) => Some(*id),
            _ => None,
        }
    }
}

/// How execution should continue after a pause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeMode {
    #[default]
    Continue,
    /// Pause again at the next breakpoint-eligible location
    Step,
}

#[derive(Debug)]
pub struct PauseSession {
    id: SessionId,
    reason: PauseReason,
    frames: FrameSnapshot,
    resumed: AtomicBool,
    controller: Weak<Shared>,
}

impl PauseSession {
    pub(crate) fn new(
        id: SessionId,
        reason: PauseReason,
        frames: FrameSnapshot,
        controller: Weak<Shared>,
    ) -> Self {
        Self {
            id,
            reason,
            frames,
            resumed: AtomicBool::new(false),
            controller,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn reason(&self) -> &PauseReason {
        &self.reason
    }

    /// Frames captured at suspension; unavailable once resumed
    pub fn frames(&self) -> ControlResult<&FrameSnapshot> {
        if self.is_live() {
            Ok(&self.frames)
        } else {
            Err(ControlError::AlreadyResumed(self.id))
        }
    }

    pub fn top_frame(&self) -> Option<&Frame> {
        self.frames().ok().and_then(FrameSnapshot::top)
    }

    pub fn is_live(&self) -> bool {
        !self.resumed.load(Ordering::SeqCst)
    }

    /// Resume execution. Only the first call succeeds.
    pub fn resume(&self) -> ControlResult<()> {
        self.resume_with(ResumeMode::Continue)
    }

    /// Resume and pause again at the next eligible location
    pub fn step(&self) -> ControlResult<()> {
        self.resume_with(ResumeMode::Step)
    }

    pub fn resume_with(&self, mode: ResumeMode) -> ControlResult<()> {
        if !self.is_live() {
            return Err(ControlError::AlreadyResumed(self.id));
        }
        let controller = self.controller.upgrade().ok_or(ControlError::Detached)?;
        controller.resume_session(self.id, mode)
    }

    // Called by the controller, under its lock, when this session ends
    pub(crate) fn mark_resumed(&self) {
        self.resumed.store(true, Ordering::SeqCst);
    }
}
