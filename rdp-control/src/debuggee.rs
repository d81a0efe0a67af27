// Interfaces consumed from the sandboxed execution environment

use crate::protocol::SnapshotError;
use crate::types::{FrameSnapshot, Value};
use thiserror::Error;

/// Failure raised while running code in the debuggee
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("SyntaxError: {0}")]
    Syntax(String),

    #[error("ReferenceError: {0} is not defined")]
    Reference(String),

    #[error("uncaught exception: {0}")]
    Thrown(Value),
}

/// Live scope of the debuggee at the current location
pub trait ExecutionContext {
    /// Evaluate an expression against the live scope
    fn evaluate(&mut self, expr: &str) -> Result<Value, EvalError>;
}

/// The running program, as seen from inside a location hook.
///
/// Hooks are called on the debuggee's own thread, so implementations need
/// not be `Send`.
pub trait Debuggee {
    fn current_scope(&mut self) -> &mut dyn ExecutionContext;

    fn snapshot_stack(&mut self) -> Result<FrameSnapshot, SnapshotError>;
}

/// Kind of breakpoint-eligible site the runtime reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    Statement,
    /// Language-level unconditional pause marker (`debugger;`)
    DebuggerStatement,
}
