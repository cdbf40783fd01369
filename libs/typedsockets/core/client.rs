use crate::traits::*;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Typed handle to one connected peer
///
/// Wraps the transport's [`Connection`] so application code never sees the raw
/// session type, and encodes outbound values with the server's shared encoder.
///
/// The only mutable state is the liveness flag:
/// - set `true` by the server whenever inbound activity is observed
/// - set `false` by the heartbeat sweep right before it sends a probe
///
/// # Type Parameters
/// - `S`: Outbound message type
pub struct ClientHandle<S> {
    connection: Arc<dyn Connection>,
    encoder: Arc<dyn Encoder<S>>,
    alive: AtomicBool,
    connected_at: DateTime<Utc>,
}

impl<S> ClientHandle<S> {
    pub(crate) fn new(connection: Arc<dyn Connection>, encoder: Arc<dyn Encoder<S>>) -> Self {
        Self {
            connection,
            encoder,
            alive: AtomicBool::new(true),
            connected_at: Utc::now(),
        }
    }

    /// Registry key of the underlying connection
    #[inline]
    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// When the handle was created
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Whether the peer has shown activity since the last probe
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Send a transport-level liveness probe
    pub fn ping(&self) {
        self.connection.ping();
    }

    /// Encode `value` and write it to the peer
    pub fn send(&self, value: &S) {
        self.connection.send(self.encoder.encode(value));
    }

    /// Immediately destroy the connection, no close handshake
    pub fn terminate(&self) {
        self.connection.terminate();
    }

    /// Close the connection, waiting for the peer's close handshake
    pub fn close(&self) {
        self.connection.close();
    }

    /// Write an already-encoded message (used by broadcast)
    pub(crate) fn send_encoded(&self, message: WsMessage) {
        self.connection.send(message);
    }

    pub(crate) fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    pub(crate) fn mark_probed(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl<S> fmt::Debug for ClientHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("id", &self.id())
            .field("alive", &self.is_alive())
            .field("connected_at", &self.connected_at)
            .finish()
    }
}
