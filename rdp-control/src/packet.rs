// Remote debugging protocol packets
//
// Packets are JSON objects. Client requests carry a `type` naming the
// command; server packets carry `from` naming the answering actor.

use crate::breakpoint::Breakpoint;
use crate::protocol::ControlError;
use crate::session::{PauseReason, PauseSession, ResumeMode};
use crate::types::{BreakpointId, Frame, SourceLocation, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const REQUEST_TYPES: &[&str] = &[
    "setBreakpoint",
    "removeBreakpoint",
    "enableBreakpoint",
    "setBreakpointCondition",
    "listBreakpoints",
    "resume",
    "frames",
    "pauseOnExceptions",
    "detach",
];

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("Unknown packet type: {0}")]
    UnknownType(String),

    #[error("Malformed packet: {0}")]
    Malformed(String),
}

impl PacketError {
    pub fn wire_name(&self) -> &'static str {
        match self {
            PacketError::UnknownType(_) => "unrecognizedPacketType",
            PacketError::Malformed(_) => "badRequest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResumeLimit {
    Step,
}

impl From<Option<ResumeLimit>> for ResumeMode {
    fn from(limit: Option<ResumeLimit>) -> Self {
        match limit {
            Some(ResumeLimit::Step) => ResumeMode::Step,
            None => ResumeMode::Continue,
        }
    }
}

/// Commands a client can send
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientRequest {
    SetBreakpoint {
        location: SourceLocation,
        #[serde(default)]
        condition: Option<String>,
    },
    RemoveBreakpoint {
        actor: BreakpointId,
    },
    EnableBreakpoint {
        actor: BreakpointId,
        enabled: bool,
    },
    SetBreakpointCondition {
        actor: BreakpointId,
        #[serde(default)]
        condition: Option<String>,
    },
    ListBreakpoints,
    Resume {
        #[serde(default, rename = "resumeLimit")]
        resume_limit: Option<ResumeLimit>,
    },
    Frames,
    PauseOnExceptions {
        enabled: bool,
    },
    Detach,
}

impl ClientRequest {
    pub fn parse(value: serde_json::Value) -> Result<Self, PacketError> {
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| PacketError::Malformed("missing 'type'".to_string()))?;

        if !REQUEST_TYPES.contains(&kind) {
            return Err(PacketError::UnknownType(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|e| PacketError::Malformed(e.to_string()))
    }
}

/// `why` member of a pause notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseWhy {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakpoint_id: Option<BreakpointId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<Value>,
}

impl From<&PauseReason> for PauseWhy {
    fn from(reason: &PauseReason) -> Self {
        let (message, exception) = match reason {
            PauseReason::Exception(info) => (Some(info.message.clone()), Some(info.value.clone())),
            PauseReason::ConditionThrew(_, err) => (Some(err.message.clone()), None),
            _ => (None, None),
        };
        Self {
            kind: reason.tag(),
            breakpoint_id: reason.breakpoint_id(),
            message,
            exception,
        }
    }
}

/// Unsolicited notification sent when the debuggee suspends
#[derive(Debug, Clone, Serialize)]
pub struct PausedPacket<'a> {
    pub from: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub why: PauseWhy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<&'a Frame>,
}

impl<'a> PausedPacket<'a> {
    pub fn new(from: &'a str, session: &'a PauseSession) -> Self {
        Self {
            from,
            kind: "paused",
            why: PauseWhy::from(session.reason()),
            frame: session.top_frame(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumedPacket<'a> {
    pub from: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl<'a> ResumedPacket<'a> {
    pub fn new(from: &'a str) -> Self {
        Self {
            from,
            kind: "resumed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointResponse<'a> {
    pub from: &'a str,
    pub actor: BreakpointId,
    pub actual_location: &'a SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakpointsResponse<'a> {
    pub from: &'a str,
    pub breakpoints: &'a [Breakpoint],
}

#[derive(Debug, Clone, Serialize)]
pub struct FramesResponse<'a> {
    pub from: &'a str,
    pub frames: &'a [Frame],
}

/// Empty acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct AckPacket<'a> {
    pub from: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPacket<'a> {
    pub from: &'a str,
    pub error: &'static str,
    pub message: String,
}

impl<'a> ErrorPacket<'a> {
    pub fn from_control(from: &'a str, err: &ControlError) -> Self {
        Self {
            from,
            error: err.wire_name(),
            message: err.to_string(),
        }
    }

    pub fn from_packet(from: &'a str, err: &PacketError) -> Self {
        Self {
            from,
            error: err.wire_name(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionEvaluationError;
    use crate::types::{FrameSnapshot, ScopeRef, SessionId};
    use serde_json::json;
    use std::sync::Weak;

    fn session(reason: PauseReason, line: u32) -> PauseSession {
        let frames = FrameSnapshot::new(vec![Frame {
            depth: 0,
            name: None,
            location: SourceLocation::new("test.js", line),
            scope: ScopeRef(1),
        }]);
        PauseSession::new(SessionId(1), reason, frames, Weak::new())
    }

    #[test]
    fn test_parse_set_breakpoint() {
        let request = ClientRequest::parse(json!({
            "to": "thread1",
            "type": "setBreakpoint",
            "location": { "sourceId": "test.js", "line": 3 },
            "condition": "throw new Error()"
        }))
        .unwrap();

        assert_eq!(
            request,
            ClientRequest::SetBreakpoint {
                location: SourceLocation::new("test.js", 3),
                condition: Some("throw new Error()".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_resume_with_step_limit() {
        let request = ClientRequest::parse(json!({
            "type": "resume",
            "resumeLimit": { "type": "step" }
        }))
        .unwrap();
        assert_eq!(
            request,
            ClientRequest::Resume {
                resume_limit: Some(ResumeLimit::Step)
            }
        );

        let plain = ClientRequest::parse(json!({ "type": "resume" })).unwrap();
        assert_eq!(plain, ClientRequest::Resume { resume_limit: None });
    }

    #[test]
    fn test_parse_errors() {
        let err = ClientRequest::parse(json!({ "type": "interrupt" })).unwrap_err();
        assert_eq!(err.wire_name(), "unrecognizedPacketType");

        let err = ClientRequest::parse(json!({ "location": {} })).unwrap_err();
        assert_eq!(err.wire_name(), "badRequest");

        let err = ClientRequest::parse(json!({ "type": "removeBreakpoint", "actor": "thread1" }))
            .unwrap_err();
        assert!(matches!(err, PacketError::Malformed(_)));
    }

    #[test]
    fn test_debugger_statement_paused_packet() {
        let session = session(PauseReason::DebuggerStatement, 4);
        let packet = serde_json::to_value(PausedPacket::new("thread1", &session)).unwrap();

        assert_eq!(
            packet,
            json!({
                "from": "thread1",
                "type": "paused",
                "why": { "type": "debuggerStatement" },
                "frame": { "depth": 0, "where": { "sourceId": "test.js", "line": 4 } }
            })
        );
    }

    #[test]
    fn test_breakpoint_paused_packet() {
        let session = session(PauseReason::Breakpoint(BreakpointId(2)), 3);
        let packet = serde_json::to_value(PausedPacket::new("thread1", &session)).unwrap();

        assert_eq!(packet["why"], json!({ "type": "breakpoint", "breakpointId": "bp2" }));
    }

    #[test]
    fn test_condition_threw_why() {
        let reason = PauseReason::ConditionThrew(
            BreakpointId(5),
            ConditionEvaluationError {
                message: "uncaught exception: [object Error]".to_string(),
            },
        );
        let why = serde_json::to_value(PauseWhy::from(&reason)).unwrap();

        assert_eq!(why["type"], "breakpointConditionThrown");
        assert_eq!(why["breakpointId"], "bp5");
        assert_eq!(why["message"], "uncaught exception: [object Error]");
    }
}
