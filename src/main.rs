//! voice-command-daemon: background daemon for wake-phrase voice commands
//!
//! The daemon owns the voice interaction engine and provides:
//! - A single engine task that serializes every recognition, playback and
//!   user event
//! - An IPC server through which a host process attaches its speech engines
//! - Status and settings queries for front-ends
//!
//! Speech recognition and synthesis themselves run in the host.

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use voice_command::engine::{EngineRunner, RunnerCommand};
use voice_command::events::StateEvent;
use voice_command::host::HostCommand;
use voice_command::ipc::{Links, Server};
use voice_command::lifecycle::ShutdownSignal;
use voice_command::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "voice-command-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        ?config.settings_path,
        language = %config.voice.language,
        "configuration loaded"
    );

    let mut shutdown = ShutdownSignal::new()?;

    // IPC server -> engine runner
    let (runner_tx, runner_rx) = mpsc::channel::<RunnerCommand>(64);
    // Engine -> IPC server (state events)
    let (event_tx, _) = broadcast::channel::<StateEvent>(64);
    // Engine -> attached host (channel and surface commands)
    let (host_tx, _) = broadcast::channel::<HostCommand>(256);

    let mut runner = EngineRunner::new(config.voice.clone(), host_tx.clone(), event_tx.clone());
    let runner_task = tokio::spawn(async move { runner.run(runner_rx).await });

    let server = Server::new(
        &config.socket_path,
        &config.voice,
        Links {
            runner_tx: runner_tx.clone(),
            events: event_tx.clone(),
            host: host_tx,
        },
    )?;

    // Subscribe to state events for IPC status updates
    let mut status_rx = event_tx.subscribe();

    info!("daemon initialized, waiting for a host to attach");

    tokio::select! {
        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Keep the status snapshot in step with the engine
        _ = async {
            loop {
                match status_rx.recv().await {
                    Ok(event) => {
                        info!(%event, "state event");
                        server.apply_event(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "state event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("state event handler exited");
        }

        signal = shutdown.wait() => {
            info!(signal, "shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    if runner_tx.send(RunnerCommand::Shutdown).await.is_err() {
        warn!("engine runner already stopped");
    }
    if let Err(e) = runner_task.await {
        error!(?e, "engine runner task failed");
    }
    server.shutdown().await;

    info!("voice-command-daemon stopped");

    Ok(())
}
