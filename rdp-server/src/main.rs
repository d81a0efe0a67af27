// RDP debug server - remote debugging of a script debuggee
//
// Runs a script under the execution controller and speaks newline-delimited
// JSON protocol packets over stdio.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rdp_control::{
    ChannelGateway, ConditionErrorPolicy, ControllerConfig, DebugConnection, GatewayEvent,
    ProtocolGateway,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

mod handlers;
mod script;
mod session;

use handlers::RequestHandler;
use script::Script;
use session::DebuggeeSession;

// The stdio transport serves a single debuggee thread
const DEBUGGEE_ACTOR: &str = "thread1";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConditionErrors {
    /// Treat the breakpoint as not hit
    Skip,
    /// Pause with a breakpointConditionThrown reason
    Pause,
}

impl From<ConditionErrors> for ConditionErrorPolicy {
    fn from(value: ConditionErrors) -> Self {
        match value {
            ConditionErrors::Skip => ConditionErrorPolicy::Skip,
            ConditionErrors::Pause => ConditionErrorPolicy::Pause,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "rdp-server", version, about = "Remote debugging server for line scripts")]
struct Args {
    /// Script to debug
    script: PathBuf,

    /// Pause when the script throws an uncaught exception
    #[arg(long)]
    pause_on_exceptions: bool,

    /// What to do when a breakpoint condition throws
    #[arg(long, value_enum, default_value = "skip")]
    condition_errors: ConditionErrors,

    /// Pause before the first statement
    #[arg(long)]
    stop_on_entry: bool,
}

impl Args {
    fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            pause_on_exceptions: self.pause_on_exceptions,
            condition_errors: self.condition_errors.into(),
        }
    }
}

async fn write_packet<W: AsyncWrite + Unpin>(out: &mut W, packet: &Value) -> Result<()> {
    let text = serde_json::to_string(packet)?;
    debug!("Sending: {}", text);
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Tracing to stderr only - stdout carries protocol packets
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["rdp_server=info", "rdp_control=info"] {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting RDP debug server...");

    let script = Script::load(&args.script)?;
    let (gateway, mut events) = ChannelGateway::channel();
    let shared: Arc<dyn ProtocolGateway> = Arc::new(gateway.clone());
    let connection = DebugConnection::new(DEBUGGEE_ACTOR, shared, &args.controller_config());
    let handler = RequestHandler::new(connection.clone());

    let debuggee = DebuggeeSession::start(script, &connection, gateway, args.stop_on_entry)
        .context("Failed to start debuggee thread")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!("Debug server ready on {}", connection.actor());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("Client disconnected");
                        handler.shutdown();
                        break;
                    }
                    Err(e) => {
                        error!("Read error: {}", e);
                        handler.shutdown();
                        break;
                    }
                };

                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                debug!("Received: {}", line);

                let reply = match serde_json::from_str::<Value>(line) {
                    Ok(packet) => handler.handle_packet(packet),
                    Err(e) => {
                        warn!("Parse error: {}", e);
                        handler.parse_error(&e)
                    }
                };
                write_packet(&mut stdout, &reply).await?;
            }
            event = events.recv() => {
                match event {
                    Some(GatewayEvent::Paused(session)) => {
                        write_packet(&mut stdout, &handler.paused_notification(&session)).await?;
                    }
                    Some(GatewayEvent::Exited) | None => {
                        write_packet(&mut stdout, &handler.exited_notification()).await?;
                        break;
                    }
                }
            }
        }
    }

    match tokio::task::spawn_blocking(move || debuggee.join()).await? {
        Some(outcome) => info!("Debuggee outcome: {:?}", outcome),
        None => error!("Debuggee thread panicked"),
    }

    info!("RDP debug server shutting down");
    Ok(())
}
