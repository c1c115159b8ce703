//! Unix domain socket server for IPC
//!
//! Provides request-response control of the timer and push notifications of
//! timer events to subscribed clients.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::events::TimerEvent;
use crate::timer::{Command, TimerStatus};

use super::protocol::{Notification, Request, Response, MAX_MESSAGE_LEN};

/// Channels connecting the server to the timer controller
#[derive(Clone)]
pub struct TimerHandles {
    /// Latest status snapshot
    pub status: watch::Receiver<TimerStatus>,
    /// Commands into the controller loop
    pub commands: mpsc::Sender<Command>,
    /// Timer events, for subscribers
    pub events: broadcast::Sender<TimerEvent>,
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    handles: TimerHandles,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, handles: TimerHandles) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Owner-only access
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            handles,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let handles = self.handles.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, handles) => {
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
    ///
    /// Requests are read on a separate task so that a partially received
    /// message is never dropped while the loop waits on events.
    async fn handle_client(stream: UnixStream, handles: TimerHandles) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();
        let (request_tx, mut request_rx) = mpsc::channel::<Request>(8);

        let reader_task = tokio::spawn(async move {
            loop {
                match read_message(&mut reader).await {
                    Ok(Some(request)) => {
                        if request_tx.send(request).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("client disconnected");
                        break;
                    }
                    Err(e) => {
                        warn!(?e, "failed to read request");
                        break;
                    }
                }
            }
        });

        let mut events: Option<broadcast::Receiver<TimerEvent>> = None;

        let result = loop {
            tokio::select! {
                request = request_rx.recv() => {
                    let Some(request) = request else {
                        break Ok(());
                    };
                    debug!(?request, "received request");

                    let (response, subscribe) = Self::process_request(request, &handles).await;
                    if subscribe && events.is_none() {
                        events = Some(handles.events.subscribe());
                        debug!("client subscribed to notifications");
                    }

                    if let Err(e) = send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }
                event = recv_event(&mut events) => {
                    match event {
                        Ok(event) => {
                            let note = Notification::TimerEvent { event };
                            if let Err(e) = send_message(&mut writer, &note).await {
                                break Err(e);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            events = None;
                        }
                    }
                }
            }
        };

        reader_task.abort();
        result
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(request: Request, handles: &TimerHandles) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let status = handles.status.borrow().clone();
                (Response::Status(status), false)
            }

            Request::Control { control } => {
                info!(%control, "control via IPC");
                (Self::forward(handles, control.into()).await, false)
            }

            Request::SetVolume { percent } if percent > 100 => (
                Response::error(
                    "invalid_volume",
                    format!("volume must be 0-100, got {}", percent),
                ),
                false,
            ),

            Request::SetVolume { percent } => {
                info!(percent, "volume via IPC");
                (Self::forward(handles, Command::SetVolume(percent)).await, false)
            }

            Request::Subscribe => (Response::Subscribed, true),
        }
    }

    async fn forward(handles: &TimerHandles, command: Command) -> Response {
        match handles.commands.send(command).await {
            Ok(()) => Response::Ack,
            Err(_) => Response::error("unavailable", "timer controller is not running"),
        }
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

/// Wait for the next event, or forever when not subscribed
async fn recv_event(
    events: &mut Option<broadcast::Receiver<TimerEvent>>,
) -> Result<TimerEvent, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Read one length-prefixed JSON request. `None` on clean EOF.
async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Request>> {
    let mut len_buf = [0u8; 4];

    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        anyhow::bail!("message too large ({} bytes)", len);
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;

    let request = serde_json::from_slice(&msg_buf).context("failed to parse request")?;
    Ok(Some(request))
}

/// Send a length-prefixed JSON message
async fn send_message<W: AsyncWrite + Unpin, T: Serialize>(writer: &mut W, msg: &T) -> Result<()> {
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}
