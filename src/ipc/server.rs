//! Unix domain socket server for IPC
//!
//! Provides request-response communication, forwards engine input to the
//! runner, and pushes host commands and state events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::VoiceSettings;
use crate::engine::{AttachmentId, RunnerCommand};
use crate::events::StateEvent;
use crate::host::HostCommand;

use super::protocol::{
    DaemonStatus, Notification, Request, Response, SettingsSnapshot, MAX_FRAME_LEN,
};

/// Channels connecting the server to the rest of the daemon
#[derive(Debug, Clone)]
pub struct Links {
    /// Input queue of the engine runner
    pub runner_tx: mpsc::Sender<RunnerCommand>,
    /// State events broadcast by the engine
    pub events: broadcast::Sender<StateEvent>,
    /// Commands for the attached host
    pub host: broadcast::Sender<HostCommand>,
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
    links: Links,
}

/// Shared server state
struct ServerState {
    status: DaemonStatus,
    settings: SettingsSnapshot,
    start_time: std::time::Instant,
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, settings: &VoiceSettings, links: Links) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let status = DaemonStatus {
            synthesis_enabled: settings.synthesis_enabled,
            ..DaemonStatus::default()
        };
        let state = Arc::new(RwLock::new(ServerState {
            status,
            settings: SettingsSnapshot::from(settings),
            start_time: std::time::Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            shutdown_tx,
            links,
        })
    }

    /// Fold a state event into the status and settings snapshots
    pub async fn apply_event(&self, event: &StateEvent) {
        let mut state = self.state.write().await;
        let old_mode = state.status.mode;
        state.status.apply(event);
        state.settings.apply(event);

        if old_mode != state.status.mode {
            info!(
                from = %old_mode,
                to = %state.status.mode,
                "IPC server: mode updated"
            );
        }
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let links = self.links.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, links) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        stream: UnixStream,
        state: Arc<RwLock<ServerState>>,
        links: Links,
    ) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();
        let (out_tx, mut out_rx) = mpsc::channel::<Vec<u8>>(64);

        let writer_task = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = writer.write_all(&frame).await {
                    debug!(?e, "client write failed");
                    break;
                }
            }
        });

        let mut session = Session {
            out_tx,
            forwarder: None,
            attached: None,
        };
        let result = session.serve(&mut reader, &state, &links).await;

        if let Some(attachment) = session.attached.take() {
            info!(attachment = attachment.0, "attached host disconnected");
            let _ = links
                .runner_tx
                .send(RunnerCommand::Detach { attachment })
                .await;
        }
        drop(session);
        let _ = writer_task.await;

        result
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Per-connection state
struct Session {
    out_tx: mpsc::Sender<Vec<u8>>,
    forwarder: Option<JoinHandle<()>>,
    /// Attachment made over this connection
    attached: Option<AttachmentId>,
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

impl Session {
    async fn serve<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
        state: &Arc<RwLock<ServerState>>,
        links: &Links,
    ) -> Result<()> {
        while let Some(body) = read_frame(reader).await? {
            let response = match serde_json::from_slice::<Request>(&body) {
                Ok(request) => {
                    debug!(?request, "received request");
                    self.process_request(request, state, links).await
                }
                Err(e) => {
                    warn!(error = %e, "unparseable request");
                    Response::error("bad_request", e.to_string())
                }
            };

            let subscribed = matches!(response, Response::Subscribed);
            self.send(&response).await?;

            // Forward only after the confirmation is queued so it arrives first
            if subscribed && self.forwarder.is_none() {
                debug!("client subscribed to notifications");
                self.forwarder = Some(spawn_forwarder(links, self.out_tx.clone()));
            }
        }

        debug!("client disconnected");
        Ok(())
    }

    async fn send<T: Serialize>(&self, msg: &T) -> Result<()> {
        let frame = encode_frame(msg)?;
        self.out_tx
            .send(frame)
            .await
            .context("client writer closed")?;
        Ok(())
    }

    /// Process a request and return a response
    async fn process_request(
        &mut self,
        request: Request,
        state: &Arc<RwLock<ServerState>>,
        links: &Links,
    ) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => {
                let mut state = state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                Response::Status(state.status.clone())
            }

            Request::GetSettings => Response::Settings(state.read().await.settings.clone()),

            Request::Subscribe => Response::Subscribed,

            Request::Attach { capabilities } => {
                let (reply, reply_rx) = oneshot::channel();
                let command = RunnerCommand::Attach {
                    capabilities,
                    reply,
                };
                if links.runner_tx.send(command).await.is_err() {
                    return engine_unavailable();
                }
                match reply_rx.await {
                    Ok(Ok(attachment)) => {
                        self.attached = Some(attachment);
                        Response::Attached
                    }
                    Ok(Err(e)) => Response::error(e.code(), e.to_string()),
                    Err(_) => engine_unavailable(),
                }
            }

            Request::Detach => match self.attached.take() {
                Some(attachment) => forward(links, RunnerCommand::Detach { attachment }).await,
                None => Response::error("not_attached", "this connection has not attached a host"),
            },

            other => match other.into_engine_event() {
                Some(event) => forward(links, RunnerCommand::Engine(event)).await,
                None => Response::error("bad_request", "request not handled"),
            },
        }
    }
}

async fn forward(links: &Links, command: RunnerCommand) -> Response {
    match links.runner_tx.send(command).await {
        Ok(()) => Response::Accepted,
        Err(_) => engine_unavailable(),
    }
}

fn engine_unavailable() -> Response {
    Response::error("engine_unavailable", "engine runner is not running")
}

/// Push host commands and state events to one subscribed client
fn spawn_forwarder(links: &Links, out_tx: mpsc::Sender<Vec<u8>>) -> JoinHandle<()> {
    let mut host_rx = links.host.subscribe();
    let mut event_rx = links.events.subscribe();

    tokio::spawn(async move {
        loop {
            let notification = tokio::select! {
                command = host_rx.recv() => match command {
                    Ok(command) => Notification::Host(command),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "host command receiver lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                event = event_rx.recv() => match event {
                    Ok(event) => Notification::StateEvent(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "state event receiver lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            let frame = match encode_frame(&notification) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(?e, "failed to encode notification");
                    continue;
                }
            };
            if out_tx.send(frame).await.is_err() {
                break;
            }
        }
    })
}

/// Encode a length-prefixed JSON message
fn encode_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(msg)?;
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Read one frame body. `None` on a clean disconnect or an oversized frame.
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        warn!(len, "message too large, disconnecting");
        return Ok(None);
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}
