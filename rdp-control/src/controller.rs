// Execution controller
//
// Drives one debuggee between Running and Paused. The runtime calls the
// hooks synchronously on the debuggee's own thread; when the controller
// decides to suspend, the hook blocks on a condvar until the PauseSession is
// resumed from the command channel (or the debugger detaches).

use crate::condition::{ConditionEvaluator, ConditionOutcome};
use crate::config::{ConditionErrorPolicy, ControllerConfig};
use crate::debuggee::{Debuggee, SiteKind};
use crate::gateway::ProtocolGateway;
use crate::protocol::{ControlError, ControlResult, Transition};
use crate::registry::BreakpointRegistry;
use crate::session::{PauseReason, PauseSession, ResumeMode};
use crate::types::{ExceptionInfo, ExecutionMode, SessionId, SourceLocation};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// What a hook call did before returning control to the debuggee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// No pause; execution continues
    Continued,
    /// Execution was suspended and has now been resumed
    Resumed(ResumeMode),
    /// The debugger is gone; hooks are no-ops from now on
    Detached,
}

#[derive(Debug)]
struct ControlState {
    mode: ExecutionMode,
    active: Option<Arc<PauseSession>>,
    next_session: u64,
    last_resume: ResumeMode,
    step_pending: bool,
    // Set while a breakpoint condition runs in the debuggee
    evaluating: bool,
    attached: bool,
    pause_on_exceptions: bool,
}

#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<ControlState>,
    resumed: Condvar,
}

impl Shared {
    // State transitions are completed before the guard drops.
    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn resume_session(&self, id: SessionId, mode: ResumeMode) -> ControlResult<()> {
        let mut state = self.lock();
        match &state.active {
            Some(active) if active.id() == id => {}
            _ => return Err(ControlError::AlreadyResumed(id)),
        }
        Self::finish_pause(&mut state, mode);
        drop(state);
        self.resumed.notify_all();
        info!("Resumed {} ({:?})", id, mode);
        Ok(())
    }

    fn finish_pause(state: &mut ControlState, mode: ResumeMode) {
        if let Some(session) = state.active.take() {
            session.mark_resumed();
        }
        state.mode = ExecutionMode::Running;
        state.last_resume = mode;
        state.step_pending = mode == ResumeMode::Step;
    }
}

/// Per-debuggee execution controller.
///
/// Cloning yields another handle to the same state machine: one clone lives
/// in the runtime's hooks, another in the command layer.
#[derive(Clone)]
pub struct ExecutionController {
    shared: Arc<Shared>,
    registry: BreakpointRegistry,
    evaluator: ConditionEvaluator,
    gateway: Arc<dyn ProtocolGateway>,
    condition_errors: ConditionErrorPolicy,
}

impl ExecutionController {
    pub fn new(
        registry: BreakpointRegistry,
        gateway: Arc<dyn ProtocolGateway>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ControlState {
                    mode: ExecutionMode::Running,
                    active: None,
                    next_session: 0,
                    last_resume: ResumeMode::Continue,
                    step_pending: false,
                    evaluating: false,
                    attached: true,
                    pause_on_exceptions: config.pause_on_exceptions,
                }),
                resumed: Condvar::new(),
            }),
            registry,
            evaluator: ConditionEvaluator::new(),
            gateway,
            condition_errors: config.condition_errors,
        }
    }

    pub fn registry(&self) -> &BreakpointRegistry {
        &self.registry
    }

    pub fn mode(&self) -> ExecutionMode {
        self.shared.lock().mode
    }

    pub fn current_session(&self) -> Option<Arc<PauseSession>> {
        self.shared.lock().active.clone()
    }

    pub fn set_pause_on_exceptions(&self, enabled: bool) {
        self.shared.lock().pause_on_exceptions = enabled;
        debug!("pause_on_exceptions={}", enabled);
    }

    /// Arm a pause at the next eligible location (e.g. stop-on-entry)
    pub fn request_step(&self) {
        self.shared.lock().step_pending = true;
    }

    /// Runtime hook: the debuggee reached a breakpoint-eligible location.
    ///
    /// Blocks the calling thread while the debuggee is paused.
    pub fn reached_location(
        &self,
        debuggee: &mut dyn Debuggee,
        location: &SourceLocation,
        site: SiteKind,
    ) -> ControlResult<HookOutcome> {
        let step_pending = {
            let state = self.shared.lock();
            if !state.attached {
                return Ok(HookOutcome::Detached);
            }
            if state.evaluating {
                // Reached from inside a breakpoint condition
                return Ok(HookOutcome::Continued);
            }
            if state.mode == ExecutionMode::Paused {
                warn!("Location hook at {} while paused, ignoring", location);
                return Err(ControlError::InvalidTransition(Transition::HookWhilePaused));
            }
            state.step_pending
        };

        match self.pause_reason(debuggee, location, site, step_pending) {
            Some(reason) => self.suspend(debuggee, reason),
            None => Ok(HookOutcome::Continued),
        }
    }

    /// Runtime hook: the debuggee threw an exception at `location`
    pub fn exception_thrown(
        &self,
        debuggee: &mut dyn Debuggee,
        location: &SourceLocation,
        exception: ExceptionInfo,
    ) -> ControlResult<HookOutcome> {
        {
            let state = self.shared.lock();
            if !state.attached {
                return Ok(HookOutcome::Detached);
            }
            if state.evaluating || !state.pause_on_exceptions {
                return Ok(HookOutcome::Continued);
            }
            if state.mode == ExecutionMode::Paused {
                warn!("Exception hook at {} while paused, ignoring", location);
                return Err(ControlError::InvalidTransition(Transition::HookWhilePaused));
            }
        }

        debug!("Pausing on exception at {}: {}", location, exception.message);
        self.suspend(debuggee, PauseReason::Exception(exception))
    }

    fn pause_reason(
        &self,
        debuggee: &mut dyn Debuggee,
        location: &SourceLocation,
        site: SiteKind,
        step_pending: bool,
    ) -> Option<PauseReason> {
        if site == SiteKind::DebuggerStatement {
            return Some(PauseReason::DebuggerStatement);
        }

        if let Some(bp) = self.registry.lookup(location).filter(|bp| bp.enabled) {
            self.shared.lock().evaluating = true;
            let outcome = self
                .evaluator
                .evaluate(bp.condition(), debuggee.current_scope());
            self.shared.lock().evaluating = false;

            match outcome {
                ConditionOutcome::True => return Some(PauseReason::Breakpoint(bp.id)),
                ConditionOutcome::False => {
                    debug!("Breakpoint {} condition false at {}", bp.id, location);
                }
                ConditionOutcome::Threw(err) => {
                    warn!(
                        breakpoint = %bp.id,
                        location = %location,
                        error = %err,
                        "Breakpoint condition threw"
                    );
                    if self.condition_errors == ConditionErrorPolicy::Pause {
                        return Some(PauseReason::ConditionThrew(bp.id, err));
                    }
                }
            }
        }

        step_pending.then_some(PauseReason::Step)
    }

    // Paused transition. On snapshot failure nothing changes and the
    // debuggee keeps running.
    fn suspend(
        &self,
        debuggee: &mut dyn Debuggee,
        reason: PauseReason,
    ) -> ControlResult<HookOutcome> {
        let frames = debuggee.snapshot_stack().map_err(|err| {
            warn!("Stack snapshot failed, not pausing: {}", err);
            ControlError::SnapshotFailure(err)
        })?;

        let session = {
            let mut state = self.shared.lock();
            if !state.attached {
                return Ok(HookOutcome::Detached);
            }
            if state.mode == ExecutionMode::Paused {
                warn!(
                    "Refusing nested pause while {:?} is active",
                    state.active.as_ref().map(|s| s.id())
                );
                return Err(ControlError::InvalidTransition(Transition::HookWhilePaused));
            }
            state.next_session += 1;
            let session = Arc::new(PauseSession::new(
                SessionId(state.next_session),
                reason,
                frames,
                Arc::downgrade(&self.shared),
            ));
            state.mode = ExecutionMode::Paused;
            state.step_pending = false;
            state.active = Some(session.clone());
            session
        };

        if let PauseReason::Breakpoint(id) = session.reason() {
            self.registry.record_hit(*id);
        }

        info!(
            "Paused {} reason={} at {:?}",
            session.id(),
            session.reason().tag(),
            session.top_frame().map(|f| f.location.to_string())
        );
        self.gateway.on_pause(session.clone());

        let mut state = self.shared.lock();
        while state.active.as_ref().is_some_and(|active| active.id() == session.id()) {
            state = self
                .shared
                .resumed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if !state.attached {
            return Ok(HookOutcome::Detached);
        }
        let mode = state.last_resume;
        drop(state);

        self.gateway.on_resumed(session.id());
        Ok(HookOutcome::Resumed(mode))
    }

    /// Resume the active pause, whichever session it is
    pub fn resume(&self, mode: ResumeMode) -> ControlResult<()> {
        let id = self
            .current_session()
            .map(|session| session.id())
            .ok_or(ControlError::InvalidTransition(Transition::NotPaused))?;
        self.shared.resume_session(id, mode)
    }

    /// Tear down the debugging session: release any pause, drop every
    /// breakpoint, and turn all further hooks into no-ops.
    pub fn detach(&self) {
        {
            let mut state = self.shared.lock();
            state.attached = false;
            Shared::finish_pause(&mut state, ResumeMode::Continue);
            state.step_pending = false;
        }
        self.registry.clear();
        self.shared.resumed.notify_all();
        info!("Debugger detached");
    }

    pub fn is_attached(&self) -> bool {
        self.shared.lock().attached
    }
}
