// Protocol request handlers
//
// Maps client packets onto the connection's registry and controller, and
// renders pause notifications.

use rdp_control::packet::{
    AckPacket, BreakpointsResponse, ClientRequest, ErrorPacket, FramesResponse, PacketError,
    PausedPacket, ResumedPacket, SetBreakpointResponse,
};
use rdp_control::{
    ControlError, ControlResult, DebugConnection, PauseSession, ResumeMode, Transition,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

pub struct RequestHandler {
    connection: DebugConnection,
}

impl RequestHandler {
    pub fn new(connection: DebugConnection) -> Self {
        Self { connection }
    }

    fn actor(&self) -> &str {
        self.connection.actor()
    }

    /// Handle one client packet and produce the reply packet
    pub fn handle_packet(&self, packet: Value) -> Value {
        let request = match ClientRequest::parse(packet) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected packet: {}", e);
                return to_packet(&ErrorPacket::from_packet(self.actor(), &e));
            }
        };

        debug!("Handling {:?}", request);

        match self.handle_request(request) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Request failed: {}", e);
                to_packet(&ErrorPacket::from_control(self.actor(), &e))
            }
        }
    }

    fn handle_request(&self, request: ClientRequest) -> ControlResult<Value> {
        let registry = self.connection.registry();
        let controller = self.connection.controller();

        match request {
            ClientRequest::SetBreakpoint {
                location,
                condition,
            } => {
                let id = registry.set(location.clone(), condition.as_deref());
                Ok(to_packet(&SetBreakpointResponse {
                    from: self.actor(),
                    actor: id,
                    actual_location: &location,
                }))
            }
            ClientRequest::RemoveBreakpoint { actor } => {
                registry.remove(actor)?;
                Ok(self.ack())
            }
            ClientRequest::EnableBreakpoint { actor, enabled } => {
                registry.enable(actor, enabled)?;
                Ok(self.ack())
            }
            ClientRequest::SetBreakpointCondition { actor, condition } => {
                registry.update_condition(actor, condition.as_deref())?;
                Ok(self.ack())
            }
            ClientRequest::ListBreakpoints => {
                let breakpoints = registry.list();
                Ok(to_packet(&BreakpointsResponse {
                    from: self.actor(),
                    breakpoints: &breakpoints,
                }))
            }
            ClientRequest::Resume { resume_limit } => {
                let mode = ResumeMode::from(resume_limit);
                controller.resume(mode)?;
                Ok(to_packet(&ResumedPacket::new(self.actor())))
            }
            ClientRequest::Frames => {
                let session = controller
                    .current_session()
                    .ok_or(ControlError::InvalidTransition(Transition::NotPaused))?;
                let frames = session.frames()?;
                Ok(to_packet(&FramesResponse {
                    from: self.actor(),
                    frames: frames.frames(),
                }))
            }
            ClientRequest::PauseOnExceptions { enabled } => {
                controller.set_pause_on_exceptions(enabled);
                Ok(self.ack())
            }
            ClientRequest::Detach => {
                info!("Client detached from {}", self.actor());
                self.connection.close();
                Ok(json!({ "from": self.actor(), "type": "detached" }))
            }
        }
    }

    /// Notification for a new pause
    pub fn paused_notification(&self, session: &PauseSession) -> Value {
        to_packet(&PausedPacket::new(self.actor(), session))
    }

    /// Reply for a line that is not JSON at all
    pub fn parse_error(&self, err: &serde_json::Error) -> Value {
        let err = PacketError::Malformed(err.to_string());
        to_packet(&ErrorPacket::from_packet(self.actor(), &err))
    }

    pub fn exited_notification(&self) -> Value {
        json!({ "from": self.actor(), "type": "exited" })
    }

    /// Client connection closed: release the debuggee
    pub fn shutdown(&self) {
        self.connection.close();
    }

    fn ack(&self) -> Value {
        to_packet(&AckPacket { from: self.actor() })
    }
}

fn to_packet<T: Serialize>(packet: &T) -> Value {
    serde_json::to_value(packet).unwrap_or_else(|e| {
        error!("Failed to serialize packet: {}", e);
        json!({ "error": "internalError", "message": e.to_string() })
    })
}
