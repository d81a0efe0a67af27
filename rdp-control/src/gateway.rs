// Protocol gateway
//
// The controller hands every new PauseSession to a gateway, which turns it
// into a pause notification for the remote client.

use crate::session::PauseSession;
use crate::types::SessionId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub trait ProtocolGateway: Send + Sync {
    /// Called on the debuggee thread right after suspension, before it blocks.
    /// Must not block waiting for the client.
    fn on_pause(&self, session: Arc<PauseSession>);

    /// Called on the debuggee thread once it is running again
    fn on_resumed(&self, _id: SessionId) {}
}

/// Events forwarded to the client-facing loop
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Paused(Arc<PauseSession>),
    /// The debuggee ran to completion
    Exited,
}

/// Gateway that forwards events over an unbounded channel, so the debuggee
/// thread never waits on the client connection.
#[derive(Debug, Clone)]
pub struct ChannelGateway {
    tx: mpsc::UnboundedSender<GatewayEvent>,
}

impl ChannelGateway {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GatewayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn notify_exited(&self) {
        self.send(GatewayEvent::Exited);
    }

    fn send(&self, event: GatewayEvent) {
        if self.tx.send(event).is_err() {
            warn!("Gateway receiver dropped, event discarded");
        }
    }
}

impl ProtocolGateway for ChannelGateway {
    fn on_pause(&self, session: Arc<PauseSession>) {
        self.send(GatewayEvent::Paused(session));
    }

    fn on_resumed(&self, id: SessionId) {
        debug!("Debuggee running again after {}", id);
    }
}
