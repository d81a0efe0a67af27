// Pause/resume behavior driven from a debuggee thread, the way a runtime
// would call the hooks.

use rdp_control::{
    BreakpointRegistry, ControllerConfig, Debuggee, EvalError, ExecutionContext,
    ExecutionController, ExecutionMode, Frame, FrameSnapshot, HookOutcome, PauseReason,
    PauseSession, ProtocolGateway, ScopeRef, SiteKind, SnapshotError, SourceLocation, Value,
};
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const SCRIPT: &[&str] = &["debugger;", "var a = 1;", "var b = 2;", "debugger;"];
const TIMEOUT: Duration = Duration::from_secs(5);

struct RecordingGateway(Mutex<Sender<Arc<PauseSession>>>);

impl ProtocolGateway for RecordingGateway {
    fn on_pause(&self, session: Arc<PauseSession>) {
        self.0.lock().unwrap().send(session).unwrap();
    }
}

/// Runs SCRIPT one line at a time; `var x = N;` assigns into a flat scope
struct LineDebuggee {
    line: u32,
    scope: HashMap<String, Value>,
}

impl ExecutionContext for LineDebuggee {
    fn evaluate(&mut self, expr: &str) -> Result<Value, EvalError> {
        if expr.starts_with("throw") {
            return Err(EvalError::Thrown(Value::Object("Error".to_string())));
        }
        if let Ok(n) = expr.parse::<f64>() {
            return Ok(Value::Number(n));
        }
        self.scope
            .get(expr)
            .cloned()
            .ok_or_else(|| EvalError::Reference(expr.to_string()))
    }
}

impl Debuggee for LineDebuggee {
    fn current_scope(&mut self) -> &mut dyn ExecutionContext {
        self
    }

    fn snapshot_stack(&mut self) -> Result<FrameSnapshot, SnapshotError> {
        Ok(FrameSnapshot::new(vec![Frame {
            depth: 0,
            name: None,
            location: SourceLocation::new("test.js", self.line),
            scope: ScopeRef(1),
        }]))
    }
}

fn setup() -> (ExecutionController, Receiver<Arc<PauseSession>>) {
    // RUST_LOG=rdp_control=debug shows the controller's trace
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let (tx, rx) = channel();
    let gateway = Arc::new(RecordingGateway(Mutex::new(tx)));
    let controller =
        ExecutionController::new(BreakpointRegistry::new(), gateway, &ControllerConfig::default());
    (controller, rx)
}

fn run_script(controller: ExecutionController) -> thread::JoinHandle<Vec<HookOutcome>> {
    thread::spawn(move || {
        let mut debuggee = LineDebuggee {
            line: 0,
            scope: HashMap::new(),
        };
        let mut outcomes = Vec::new();
        for (index, text) in SCRIPT.iter().enumerate() {
            debuggee.line = index as u32 + 1;
            let site = if *text == "debugger;" {
                SiteKind::DebuggerStatement
            } else {
                SiteKind::Statement
            };
            let location = SourceLocation::new("test.js", debuggee.line);
            outcomes.push(controller.reached_location(&mut debuggee, &location, site).unwrap());

            if let Some(rest) = text.strip_prefix("var ") {
                let (name, value) = rest.trim_end_matches(';').split_once(" = ").unwrap();
                let value = Value::Number(value.parse().unwrap());
                debuggee.scope.insert(name.to_string(), value);
            }
        }
        outcomes
    })
}

fn top_line(session: &PauseSession) -> u32 {
    session.top_frame().unwrap().location.line
}

#[test]
fn throwing_condition_is_skipped_until_next_debugger_statement() {
    let (controller, rx) = setup();
    let handle = run_script(controller.clone());

    let first = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(first.reason(), &PauseReason::DebuggerStatement);
    assert_eq!(top_line(&first), 1);

    let bp = controller
        .registry()
        .set(SourceLocation::new("test.js", 3), Some("throw new Error()"));
    first.resume().unwrap();

    let second = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(second.reason(), &PauseReason::DebuggerStatement);
    assert_eq!(top_line(&second), 4);

    controller.registry().remove(bp).unwrap();
    second.resume().unwrap();

    let outcomes = handle.join().unwrap();
    assert_eq!(outcomes.len(), SCRIPT.len());
    assert_eq!(outcomes[2], HookOutcome::Continued);
    assert!(rx.try_recv().is_err());
    assert_eq!(controller.mode(), ExecutionMode::Running);
}

#[test]
fn true_condition_pauses_with_breakpoint_reason() {
    let (controller, rx) = setup();
    let bp = controller
        .registry()
        .set(SourceLocation::new("test.js", 3), Some("a"));
    let handle = run_script(controller.clone());

    let first = rx.recv_timeout(TIMEOUT).unwrap();
    first.resume().unwrap();

    let second = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(second.reason(), &PauseReason::Breakpoint(bp));
    assert_eq!(top_line(&second), 3);
    let frames = second.frames().unwrap();
    assert_eq!(frames.len(), 1);
    second.resume().unwrap();

    let third = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(top_line(&third), 4);
    third.resume().unwrap();

    handle.join().unwrap();
    assert_eq!(controller.registry().get(bp).unwrap().hit_count, 1);
}

#[test]
fn removed_breakpoint_never_pauses() {
    let (controller, rx) = setup();
    let bp = controller
        .registry()
        .set(SourceLocation::new("test.js", 2), None);
    controller.registry().remove(bp).unwrap();
    let handle = run_script(controller.clone());

    let mut lines = Vec::new();
    for _ in 0..2 {
        let session = rx.recv_timeout(TIMEOUT).unwrap();
        lines.push(top_line(&session));
        session.resume().unwrap();
    }

    handle.join().unwrap();
    assert_eq!(lines, vec![1, 4]);
    assert!(rx.try_recv().is_err());
}

#[test]
fn removal_during_pause_does_not_unpause() {
    let (controller, rx) = setup();
    let bp = controller
        .registry()
        .set(SourceLocation::new("test.js", 2), None);
    let handle = run_script(controller.clone());

    rx.recv_timeout(TIMEOUT).unwrap().resume().unwrap();

    let paused = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(paused.reason(), &PauseReason::Breakpoint(bp));
    controller.registry().remove(bp).unwrap();
    assert_eq!(controller.mode(), ExecutionMode::Paused);
    assert!(paused.is_live());
    paused.resume().unwrap();

    rx.recv_timeout(TIMEOUT).unwrap().resume().unwrap();
    handle.join().unwrap();
}
