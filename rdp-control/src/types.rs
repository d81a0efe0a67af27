// Debugger type definitions
//
// Common types shared by the registry, controller and wire packets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifies a registered source (script, file, eval chunk)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(Arc<str>);

impl SourceId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// SourceLocation identifies a breakpoint-able position.
// Cloning only bumps the source id refcount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub source_id: SourceId,
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl SourceLocation {
    pub fn new(source_id: impl Into<SourceId>, line: u32) -> Self {
        Self {
            source_id: source_id.into(),
            line,
            column: None,
        }
    }

    pub fn with_column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    /// The same position with the column dropped, matching any column on the line
    pub fn line_wide(&self) -> Self {
        Self {
            source_id: self.source_id.clone(),
            line: self.line,
            column: None,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(column) => write!(f, "{}:{}:{}", self.source_id, self.line, column),
            None => write!(f, "{}:{}", self.source_id, self.line),
        }
    }
}

/// Breakpoint identifier, rendered on the wire as the actor name `bp<N>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct BreakpointId(pub u64);

const BREAKPOINT_ACTOR_PREFIX: &str = "bp";

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", BREAKPOINT_ACTOR_PREFIX, self.0)
    }
}

impl From<BreakpointId> for String {
    fn from(id: BreakpointId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for BreakpointId {
    type Error = String;

    fn try_from(actor: String) -> Result<Self, Self::Error> {
        actor
            .strip_prefix(BREAKPOINT_ACTOR_PREFIX)
            .and_then(|n| n.parse::<u64>().ok())
            .map(BreakpointId)
            .ok_or_else(|| format!("Not a breakpoint actor: {}", actor))
    }
}

/// Identifier of one suspension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pause{}", self.0)
    }
}

/// Opaque handle to a frame's scope chain inside the debuggee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeRef(pub u64);

// Debuggee value grip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(String),
}

impl Value {
    /// Truthiness as the debuggee language defines it
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Object(class) => write!(f, "[object {}]", class),
        }
    }
}

/// Description of an exception thrown by the debuggee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    pub message: String,
    pub value: Value,
}

// One stack frame active at pause time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "where")]
    pub location: SourceLocation,
    #[serde(skip)]
    pub scope: ScopeRef,
}

/// Frames active at pause time, innermost first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameSnapshot(Vec<Frame>);

impl FrameSnapshot {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self(frames)
    }

    pub fn top(&self) -> Option<&Frame> {
        self.0.first()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Execution mode of a debuggee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    Running,
    Paused,
}
