//! Unix domain socket server for IPC
//!
//! Provides request-response communication for the UI clients and push
//! notifications to subscribed connections. Requests are forwarded to
//! the coordinating task; the server itself holds no daemon state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixListener;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::coordinator::Command;
use crate::events::AppEvent;
use crate::hotkey::Modifiers;

use super::protocol::{HotkeyInfo, Notification, Request, Response};

const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// IPC server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    command_tx: mpsc::Sender<Command>,
    event_tx: broadcast::Sender<AppEvent>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind the socket and prepare to accept connections.
    pub fn new(
        socket_path: &Path,
        command_tx: mpsc::Sender<Command>,
        event_tx: broadcast::Sender<AppEvent>,
    ) -> Result<Self> {
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

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            command_tx,
            event_tx,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self
            .listener
            .as_ref()
            .context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let command_tx = self.command_tx.clone();
                    let event_rx = self.event_tx.subscribe();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, command_tx, event_rx) => {
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

/// Handle a single client connection.
///
/// Runs request-response until the client subscribes, then switches to
/// push mode: events are forwarded as they arrive and further input is
/// only watched for disconnect.
async fn handle_client(
    stream: tokio::net::UnixStream,
    command_tx: mpsc::Sender<Command>,
    mut event_rx: broadcast::Receiver<AppEvent>,
) -> Result<()> {
    let (mut reader, mut writer) = stream.into_split();

    loop {
        let Some(frame) = read_frame(&mut reader).await? else {
            debug!("client disconnected");
            return Ok(());
        };

        let request: Request =
            serde_json::from_slice(&frame).context("failed to parse request")?;
        debug!(?request, "received request");

        let (response, subscribe) = process_request(request, &command_tx).await?;
        send_message(&mut writer, &response).await?;

        if subscribe {
            debug!("client subscribed to notifications");
            break;
        }
    }

    // Push mode. Reads are drained only to notice the disconnect.
    let mut discard = [0u8; 256];
    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Ok(event) => {
                    send_message(&mut writer, &Notification::Event(event)).await?;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
            read = reader.read(&mut discard) => {
                if read? == 0 {
                    debug!("subscribed client disconnected");
                    return Ok(());
                }
            }
        }
    }
}

/// Read one length-prefixed frame; `None` on a clean disconnect.
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        warn!(len, "message too large, disconnecting");
        return Ok(None);
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;
    Ok(Some(msg_buf))
}

/// Send a length-prefixed JSON message
async fn send_message<W: AsyncWrite + Unpin, T: serde::Serialize>(
    writer: &mut W,
    msg: &T,
) -> Result<()> {
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}

/// Forward a request to the coordinator and shape its reply.
/// Returns (Response, should_subscribe). Errors only when the
/// coordinator is gone, which ends the connection.
async fn process_request(
    request: Request,
    command_tx: &mpsc::Sender<Command>,
) -> Result<(Response, bool)> {
    let response = match request {
        Request::Ping => Response::Pong,

        Request::GetStatus => {
            let (reply, rx) = oneshot::channel();
            command_tx.send(Command::Status { reply }).await?;
            Response::Status(rx.await?)
        }

        Request::Clean => {
            let (reply, rx) = oneshot::channel();
            command_tx.send(Command::Clean { reply }).await?;
            Response::Cleaned { changed: rx.await? }
        }

        Request::GetHotkey => {
            let (reply, rx) = oneshot::channel();
            command_tx.send(Command::GetHotkey { reply }).await?;
            Response::Hotkey(HotkeyInfo::from(&rx.await?))
        }

        Request::SetHotkey {
            key_code,
            character,
            modifiers,
        } => {
            let (reply, rx) = oneshot::channel();
            command_tx
                .send(Command::ApplyHotkey {
                    key_code,
                    character,
                    modifiers: Modifiers::from_bits(modifiers),
                    reply,
                })
                .await?;
            hotkey_response(rx.await?)
        }

        Request::ResetHotkey => {
            let (reply, rx) = oneshot::channel();
            command_tx.send(Command::ResetHotkey { reply }).await?;
            hotkey_response(rx.await?)
        }

        Request::SetDetabMode { mode } => {
            let (reply, rx) = oneshot::channel();
            command_tx.send(Command::SetDetabMode { mode, reply }).await?;
            rx.await?;
            Response::Updated
        }

        Request::SetNotifications { enabled } => {
            let (reply, rx) = oneshot::channel();
            command_tx
                .send(Command::SetNotifications { enabled, reply })
                .await?;
            rx.await?;
            Response::Updated
        }

        Request::Subscribe => return Ok((Response::Subscribed, true)),
    };

    Ok((response, false))
}

fn hotkey_response(result: Result<crate::hotkey::HotKey, crate::coordinator::ApplyError>) -> Response {
    match result {
        Ok(hotkey) => Response::Hotkey(HotkeyInfo::from(&hotkey)),
        Err(e) => Response::Error {
            code: e.code().to_string(),
            message: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::UnixStream;

    use super::*;
    use crate::ipc::protocol::{DaemonStatus, Request};

    async fn write_request(stream: &mut UnixStream, request: &Request) {
        send_message(stream, request).await.unwrap();
    }

    async fn read_json<T: serde::de::DeserializeOwned>(stream: &mut UnixStream) -> T {
        let frame = read_frame(stream).await.unwrap().unwrap();
        serde_json::from_slice(&frame).unwrap()
    }

    /// Answers coordinator commands with canned replies.
    fn spawn_stub_coordinator(mut command_rx: mpsc::Receiver<Command>) {
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                match command {
                    Command::Clean { reply } => {
                        let _ = reply.send(true);
                    }
                    Command::Status { reply } => {
                        let _ = reply.send(DaemonStatus {
                            version: "0.0.0".to_string(),
                            hotkey: HotkeyInfo::from(&crate::hotkey::HotKey::default()),
                            hotkey_registered: true,
                            detab_mode: crate::cleaner::DetabMode::Off,
                            show_notification: false,
                            uptime_secs: 0,
                        });
                    }
                    Command::GetHotkey { reply } => {
                        let _ = reply.send(crate::hotkey::HotKey::default());
                    }
                    _ => {}
                }
            }
        });
    }

    fn server_fixture() -> (Server, tempfile::TempDir, broadcast::Sender<AppEvent>) {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let (command_tx, command_rx) = mpsc::channel(8);
        let (event_tx, _) = broadcast::channel(16);
        spawn_stub_coordinator(command_rx);
        let server = Server::new(&socket_path, command_tx, event_tx.clone()).unwrap();
        (server, dir, event_tx)
    }

    #[tokio::test]
    async fn test_ping_round_trip() {
        let (server, dir, _event_tx) = server_fixture();
        let socket_path = dir.path().join("test.sock");
        tokio::spawn(async move {
            let _ = server.run().await;
        });

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        write_request(&mut client, &Request::Ping).await;
        let response: Response = read_json(&mut client).await;
        assert!(matches!(response, Response::Pong));
    }

    #[tokio::test]
    async fn test_status_and_clean() {
        let (server, dir, _event_tx) = server_fixture();
        let socket_path = dir.path().join("test.sock");
        tokio::spawn(async move {
            let _ = server.run().await;
        });

        let mut client = UnixStream::connect(&socket_path).await.unwrap();

        write_request(&mut client, &Request::GetStatus).await;
        let response: Response = read_json(&mut client).await;
        match response {
            Response::Status(status) => assert!(status.hotkey_registered),
            other => panic!("unexpected response: {other:?}"),
        }

        write_request(&mut client, &Request::Clean).await;
        let response: Response = read_json(&mut client).await;
        assert!(matches!(response, Response::Cleaned { changed: true }));
    }

    #[tokio::test]
    async fn test_subscribe_receives_events() {
        let (server, dir, event_tx) = server_fixture();
        let socket_path = dir.path().join("test.sock");
        tokio::spawn(async move {
            let _ = server.run().await;
        });

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        write_request(&mut client, &Request::Subscribe).await;
        let response: Response = read_json(&mut client).await;
        assert!(matches!(response, Response::Subscribed));

        // wait until the handler is in push mode, then publish
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        event_tx.send(AppEvent::CleanSucceeded).unwrap();

        let push: Notification = read_json(&mut client).await;
        assert!(matches!(push, Notification::Event(AppEvent::CleanSucceeded)));
    }
}
