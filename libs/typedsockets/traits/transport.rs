//! Transport collaborator boundary
//!
//! The server never touches sockets. A [`Transport`] accepts peers and reports
//! everything that happens to them as [`TransportEvent`]s on a single channel;
//! each accepted peer is represented by a [`Connection`] that the server can
//! probe, write to, and close.
//!
//! ```text
//! Transport ──TransportEvent──> Server loop ──> EventBus listeners
//!     ^                              │
//!     └──── Connection ops <─────────┘ (ping / send / terminate / close)
//! ```
//!
//! # Contract
//!
//! - `Listening` is sent before [`Transport::listen`] returns `Ok`
//! - a `ConnectionId` is not reused while its connection is open; a second
//!   `Connection` with a live id is ignored by the server
//! - `Connection` is delivered before any `Message`, `Pong` or `Close` for it
//! - exactly one `Close` is delivered per connection, including after
//!   [`Connection::terminate`]
//! - `Closed` is delivered once the transport stops accepting

use crate::error::Result;
use crate::message::WsMessage;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Stable identity of a transport session
pub type ConnectionId = u64;

/// Sender half handed to [`Transport::listen`]
pub type TransportSender = mpsc::UnboundedSender<TransportEvent>;

/// Receiver half consumed by the server loop
pub type TransportReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Notifications flowing from the transport to the server
pub enum TransportEvent {
    /// The transport is accepting connections
    Listening,
    /// A peer completed the handshake
    Connection(Arc<dyn Connection>),
    /// A data frame arrived
    Message { id: ConnectionId, message: WsMessage },
    /// A protocol-level pong arrived
    Pong { id: ConnectionId },
    /// The peer's session ended, for whatever reason
    Close { id: ConnectionId },
    /// The transport stopped accepting connections
    Closed,
}

impl std::fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportEvent::Listening => f.write_str("Listening"),
            TransportEvent::Connection(conn) => {
                f.debug_tuple("Connection").field(&conn.id()).finish()
            }
            TransportEvent::Message { id, message } => f
                .debug_struct("Message")
                .field("id", id)
                .field("len", &message.len())
                .finish(),
            TransportEvent::Pong { id } => f.debug_struct("Pong").field("id", id).finish(),
            TransportEvent::Close { id } => f.debug_struct("Close").field("id", id).finish(),
            TransportEvent::Closed => f.write_str("Closed"),
        }
    }
}

/// One raw peer session, owned by the transport
///
/// All operations are fire-and-forget: failures belong to the transport and
/// eventually show up as a `Close` notification.
pub trait Connection: Send + Sync + 'static {
    /// Identity used as the registry key
    fn id(&self) -> ConnectionId;

    /// Send a protocol-level liveness probe
    fn ping(&self);

    /// Write one data frame
    fn send(&self, message: WsMessage);

    /// Destroy the session without a close handshake
    fn terminate(&self);

    /// Start a graceful close handshake
    ///
    /// A peer that never answers must still end in a `Close` notification.
    fn close(&self);
}

/// Accepts peers and reports their activity
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Start accepting connections
    ///
    /// Returns once the transport is ready (or failed to become ready).
    /// `Listening` must already be on `events` when this returns `Ok`;
    /// the server's `build()` waits for it. All subsequent activity is
    /// reported through `events`.
    async fn listen(&self, events: TransportSender) -> Result<()>;

    /// Stop accepting connections; must eventually report `Closed`
    fn shutdown(&self);
}
