//! WebSocket transport over tokio-tungstenite
//!
//! Accepts TCP connections, performs the server handshake and runs one task
//! per peer. Each task owns the socket; the [`Connection`] handed to the
//! server only forwards commands to it over an unbounded channel, so every
//! operation returns immediately.

use crate::config::ListenOptions;
use crate::traits::*;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async_with_config, WebSocketStream};
use tracing::{debug, info, trace, warn};

/// Commands from a [`TungsteniteConnection`] to its socket task
#[derive(Debug)]
enum Command {
    Ping,
    Send(WsMessage),
    Terminate,
    Close,
}

/// Handle to one accepted peer
pub struct TungsteniteConnection {
    id: ConnectionId,
    peer: SocketAddr,
    commands: mpsc::UnboundedSender<Command>,
}

impl TungsteniteConnection {
    /// Remote address of the peer
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn command(&self, command: Command) {
        // The socket task is gone once the peer closed; Close is already on its way
        if self.commands.send(command).is_err() {
            trace!("Connection {} already finished", self.id);
        }
    }
}

impl Connection for TungsteniteConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn ping(&self) {
        self.command(Command::Ping);
    }

    fn send(&self, message: WsMessage) {
        self.command(Command::Send(message));
    }

    fn terminate(&self) {
        self.command(Command::Terminate);
    }

    fn close(&self) {
        self.command(Command::Close);
    }
}

/// Per-connection settings derived from [`ListenOptions`]
#[derive(Debug, Clone)]
struct ConnectionSettings {
    path: Option<String>,
    close_timeout: Duration,
    websocket: WebSocketConfig,
}

impl ConnectionSettings {
    fn from_options(options: &ListenOptions) -> Self {
        let mut websocket = WebSocketConfig::default();
        if let Some(limit) = options.max_message_size {
            websocket.max_message_size = Some(limit);
        }
        if let Some(limit) = options.max_frame_size {
            websocket.max_frame_size = Some(limit);
        }

        Self {
            path: options.path.clone(),
            close_timeout: options.close_timeout(),
            websocket,
        }
    }
}

/// [`Transport`] that listens for WebSocket upgrades on a TCP socket
pub struct TungsteniteTransport {
    options: ListenOptions,
    local_addr: Mutex<Option<SocketAddr>>,
    shutdown: Arc<Notify>,
    next_id: Arc<AtomicU64>,
}

impl TungsteniteTransport {
    pub fn new(options: ListenOptions) -> Self {
        Self {
            options,
            local_addr: Mutex::new(None),
            shutdown: Arc::new(Notify::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Address actually bound, once listening
    ///
    /// Differs from the configured one when port 0 was requested.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    pub fn options(&self) -> &ListenOptions {
        &self.options
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn listen(&self, events: TransportSender) -> Result<()> {
        let address = self.options.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| SocketError::Transport(format!("Failed to bind {}: {}", address, e)))?;

        let bound = listener.local_addr()?;
        *self.local_addr.lock() = Some(bound);
        info!("Accepting WebSocket connections on {}", bound);

        if events.send(TransportEvent::Listening).is_err() {
            return Err(SocketError::ChannelSend(
                "server loop is not running".to_string(),
            ));
        }

        tokio::spawn(accept_loop(
            listener,
            events,
            Arc::new(ConnectionSettings::from_options(&self.options)),
            Arc::clone(&self.shutdown),
            Arc::clone(&self.next_id),
        ));

        Ok(())
    }

    fn shutdown(&self) {
        // Stores a permit if the accept loop is not currently waiting
        self.shutdown.notify_one();
    }
}

async fn accept_loop(
    listener: TcpListener,
    events: TransportSender,
    settings: Arc<ConnectionSettings>,
    shutdown: Arc<Notify>,
    next_id: Arc<AtomicU64>,
) {
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!("Shutdown requested, no longer accepting");
                break;
            }

            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let id = next_id.fetch_add(1, Ordering::Relaxed);
                        tokio::spawn(run_connection(
                            id,
                            stream,
                            peer,
                            Arc::clone(&settings),
                            events.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!("Accept error: {}", e);
                    }
                }
            }
        }
    }

    drop(listener);
    let _ = events.send(TransportEvent::Closed);
}

/// Server side of the opening handshake, rejecting unexpected paths with 404
async fn handshake(
    stream: TcpStream,
    settings: &ConnectionSettings,
) -> Result<WebSocketStream<TcpStream>> {
    let path = settings.path.clone();
    let check_path = move |request: &Request, response: Response| match &path {
        Some(expected) if request.uri().path() != expected => {
            let mut rejection = ErrorResponse::new(Some("Not Found".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
        _ => Ok(response),
    };

    let ws_stream =
        accept_hdr_async_with_config(stream, check_path, Some(settings.websocket)).await?;
    Ok(ws_stream)
}

async fn run_connection(
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
    settings: Arc<ConnectionSettings>,
    events: TransportSender,
) {
    let ws_stream = match handshake(stream, &settings).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!("Handshake with {} failed: {}", peer, e);
            return;
        }
    };

    let (commands, mut command_rx) = mpsc::unbounded_channel();
    let connection = Arc::new(TungsteniteConnection {
        id,
        peer,
        commands,
    });

    if events.send(TransportEvent::Connection(connection)).is_err() {
        return;
    }
    debug!("Connection {} established with {}", id, peer);

    let (mut write, mut read) = ws_stream.split();
    // Set once we sent a close frame; the socket is dropped when it passes
    let mut close_deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let _ = events.send(TransportEvent::Message {
                            id,
                            message: WsMessage::Text(text),
                        });
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let _ = events.send(TransportEvent::Message {
                            id,
                            message: WsMessage::Binary(data),
                        });
                    }
                    Some(Ok(Message::Pong(_))) => {
                        let _ = events.send(TransportEvent::Pong { id });
                    }
                    // Pings are answered by tungstenite; a close frame is
                    // followed by the end of the stream
                    Some(Ok(Message::Ping(_) | Message::Close(_) | Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        debug!("Connection {} read error: {}", id, SocketError::from(e));
                        break;
                    }
                    None => break,
                }
            }

            command = command_rx.recv() => {
                let outcome = match command {
                    Some(Command::Send(message)) => write.send(to_tungstenite(message)).await,
                    Some(Command::Ping) => write.send(Message::Ping(Vec::new())).await,
                    Some(Command::Close) if close_deadline.is_none() => {
                        close_deadline = Some(Instant::now() + settings.close_timeout);
                        write.send(Message::Close(None)).await
                    }
                    Some(Command::Close) => Ok(()),
                    Some(Command::Terminate) | None => {
                        trace!("Connection {} terminated", id);
                        break;
                    }
                };

                if let Err(e) = outcome {
                    debug!("Connection {} write error: {}", id, SocketError::from(e));
                    break;
                }
            }

            _ = wait_until(close_deadline) => {
                debug!(
                    "Connection {} did not answer close within {:?}, dropping socket",
                    id, settings.close_timeout
                );
                break;
            }
        }
    }

    let _ = events.send(TransportEvent::Close { id });
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn to_tungstenite(message: WsMessage) -> Message {
    match message {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listen_reports_bound_address() {
        let transport = TungsteniteTransport::new(ListenOptions {
            port: 0,
            ..ListenOptions::default()
        });
        let (tx, mut rx) = mpsc::unbounded_channel();

        transport.listen(tx).await.unwrap();

        let addr = transport.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(matches!(rx.recv().await, Some(TransportEvent::Listening)));

        transport.shutdown();
        assert!(matches!(rx.recv().await, Some(TransportEvent::Closed)));
    }

    #[tokio::test]
    async fn test_bind_failure_is_transport_error() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();

        let transport = TungsteniteTransport::new(ListenOptions {
            port,
            ..ListenOptions::default()
        });
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = transport.listen(tx).await.unwrap_err();
        assert!(matches!(err, SocketError::Transport(_)));
    }

    #[test]
    fn test_settings_carry_websocket_limits() {
        let settings = ConnectionSettings::from_options(&ListenOptions {
            path: Some("/ws".into()),
            close_timeout_ms: 250,
            max_message_size: Some(4096),
            max_frame_size: Some(1024),
            ..ListenOptions::default()
        });

        assert_eq!(settings.path.as_deref(), Some("/ws"));
        assert_eq!(settings.close_timeout, Duration::from_millis(250));
        assert_eq!(settings.websocket.max_message_size, Some(4096));
        assert_eq!(settings.websocket.max_frame_size, Some(1024));
    }

    #[test]
    fn test_settings_keep_tungstenite_defaults() {
        let settings = ConnectionSettings::from_options(&ListenOptions::default());
        let defaults = WebSocketConfig::default();

        assert_eq!(settings.websocket.max_message_size, defaults.max_message_size);
        assert_eq!(settings.websocket.max_frame_size, defaults.max_frame_size);
    }

    #[test]
    fn test_frame_conversion() {
        assert_eq!(to_tungstenite(WsMessage::from("hi")), Message::Text("hi".into()));
        assert_eq!(
            to_tungstenite(WsMessage::from(vec![1u8, 2])),
            Message::Binary(vec![1, 2])
        );
    }
}
