// Debuggee session
//
// Runs the script debuggee on its own thread, wired to one DebugConnection.
// The thread is the debuggee's single thread of control: the controller's
// hooks block it while paused.

use crate::script::{RunOutcome, Script, ScriptDebuggee};
use rdp_control::{ChannelGateway, DebugConnection};
use std::thread::{self, JoinHandle};
use tracing::{error, info};

pub struct DebuggeeSession {
    handle: JoinHandle<RunOutcome>,
}

impl DebuggeeSession {
    /// Start running `script`; `stop_on_entry` pauses before the first statement
    pub fn start(
        script: Script,
        connection: &DebugConnection,
        gateway: ChannelGateway,
        stop_on_entry: bool,
    ) -> std::io::Result<Self> {
        let controller = connection.controller().clone();
        if stop_on_entry {
            controller.request_step();
        }

        info!(
            "Starting debuggee {} ({} statements) on {}",
            script.source_id(),
            script.statement_count(),
            connection.actor()
        );

        let handle = thread::Builder::new()
            .name("debuggee".to_string())
            .spawn(move || {
                let outcome = ScriptDebuggee::new(script).run(&controller);
                match &outcome {
                    RunOutcome::Threw(exception) => {
                        error!("Debuggee terminated by uncaught exception: {}", exception.message)
                    }
                    other => info!("Debuggee finished: {:?}", other),
                }
                gateway.notify_exited();
                outcome
            })?;

        Ok(Self { handle })
    }

    /// Wait for the debuggee thread
    pub fn join(self) -> Option<RunOutcome> {
        self.handle.join().ok()
    }
}
