// Execution control for a remote debugging server
//
// Suspends a running program at breakpoints and debugger statements,
// evaluates breakpoint conditions, notifies the remote client and resumes:
// - Breakpoint registry
// - Condition evaluation
// - Execution controller and pause sessions
// - Protocol packets and gateway

pub mod breakpoint;
pub mod condition;
pub mod config;
pub mod connection;
pub mod controller;
pub mod debuggee;
pub mod gateway;
pub mod packet;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod types;

pub use breakpoint::Breakpoint;
pub use condition::{ConditionEvaluationError, ConditionEvaluator, ConditionOutcome};
pub use config::{ConditionErrorPolicy, ControllerConfig};
pub use connection::DebugConnection;
pub use controller::{ExecutionController, HookOutcome};
pub use debuggee::{Debuggee, EvalError, ExecutionContext, SiteKind};
pub use gateway::{ChannelGateway, GatewayEvent, ProtocolGateway};
pub use protocol::{ControlError, ControlResult, SnapshotError, Transition};
pub use registry::BreakpointRegistry;
pub use session::{PauseReason, PauseSession, ResumeMode};
pub use types::{
    BreakpointId, ExceptionInfo, ExecutionMode, Frame, FrameSnapshot, ScopeRef, SessionId,
    SourceId, SourceLocation, Value,
};
