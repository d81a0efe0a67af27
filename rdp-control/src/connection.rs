// Debug connection context
//
// One DebugConnection per attached client/debuggee pair. Everything the
// controller needs lives here instead of in process-wide state, so several
// sessions can run side by side without cross-talk. The transport that
// accepts the client picks the actor name.

use crate::config::ControllerConfig;
use crate::controller::ExecutionController;
use crate::gateway::ProtocolGateway;
use crate::registry::BreakpointRegistry;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct DebugConnection {
    actor: String,
    registry: BreakpointRegistry,
    controller: ExecutionController,
}

impl DebugConnection {
    pub fn new(
        actor: impl Into<String>,
        gateway: Arc<dyn ProtocolGateway>,
        config: &ControllerConfig,
    ) -> Self {
        let actor = actor.into();
        let registry = BreakpointRegistry::new();
        let controller = ExecutionController::new(registry.clone(), gateway, config);

        info!("Opened debug connection {}", actor);

        Self {
            actor,
            registry,
            controller,
        }
    }

    /// Protocol actor name of the debuggee thread
    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn registry(&self) -> &BreakpointRegistry {
        &self.registry
    }

    pub fn controller(&self) -> &ExecutionController {
        &self.controller
    }

    /// End the session: release any pause and drop all breakpoints
    pub fn close(&self) {
        info!("Closing debug connection {}", self.actor);
        self.controller.detach();
    }
}
