//! Common test utilities for typedsockets integration tests
//!
//! Provides an in-memory transport so server behaviour can be driven
//! deterministically, usually under paused tokio time.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use typedsockets::*;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Operations the server performed on a [`MockConnection`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Ping,
    Send(WsMessage),
    Terminate,
    Close,
}

/// Connection that records every operation
///
/// `terminate` reports the close back to the server, like a real transport
/// dropping the socket. `close` only records: the peer's half of the
/// handshake is up to the test.
pub struct MockConnection {
    id: ConnectionId,
    events: TransportSender,
    ops: Mutex<Vec<Op>>,
    terminated: AtomicBool,
}

impl MockConnection {
    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().clone()
    }

    pub fn pings(&self) -> usize {
        self.ops.lock().iter().filter(|op| **op == Op::Ping).count()
    }

    pub fn sent(&self) -> Vec<WsMessage> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                Op::Send(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

impl Connection for MockConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn ping(&self) {
        self.ops.lock().push(Op::Ping);
    }

    fn send(&self, message: WsMessage) {
        self.ops.lock().push(Op::Send(message));
    }

    fn terminate(&self) {
        self.ops.lock().push(Op::Terminate);
        if !self.terminated.swap(true, Ordering::AcqRel) {
            let _ = self.events.send(TransportEvent::Close { id: self.id });
        }
    }

    fn close(&self) {
        self.ops.lock().push(Op::Close);
    }
}

/// In-memory [`Transport`] driven by the test
#[derive(Default)]
pub struct MockTransport {
    events: Mutex<Option<TransportSender>>,
    shutdowns: Mutex<usize>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn emit(&self, event: TransportEvent) {
        let events = self.events.lock();
        let sender = events.as_ref().expect("transport is not listening");
        sender.send(event).expect("server loop is gone");
    }

    /// A peer completes the handshake
    pub fn connect(&self, id: ConnectionId) -> Arc<MockConnection> {
        let sender = self
            .events
            .lock()
            .clone()
            .expect("transport is not listening");

        let connection = Arc::new(MockConnection {
            id,
            events: sender,
            ops: Mutex::new(Vec::new()),
            terminated: AtomicBool::new(false),
        });

        self.emit(TransportEvent::Connection(connection.clone()));
        connection
    }

    /// A data frame arrives from peer `id`
    pub fn message(&self, id: ConnectionId, message: impl Into<WsMessage>) {
        self.emit(TransportEvent::Message {
            id,
            message: message.into(),
        });
    }

    /// A protocol pong arrives from peer `id`
    pub fn pong(&self, id: ConnectionId) {
        self.emit(TransportEvent::Pong { id });
    }

    /// Peer `id` went away
    pub fn disconnect(&self, id: ConnectionId) {
        self.emit(TransportEvent::Close { id });
    }

    /// How many times the server asked the transport to stop
    pub fn shutdown_count(&self) -> usize {
        *self.shutdowns.lock()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn listen(&self, events: TransportSender) -> Result<()> {
        let _ = events.send(TransportEvent::Listening);
        *self.events.lock() = Some(events);
        Ok(())
    }

    fn shutdown(&self) {
        *self.shutdowns.lock() += 1;
        if let Some(events) = self.events.lock().as_ref() {
            let _ = events.send(TransportEvent::Closed);
        }
    }
}

/// Let the server loop drain everything queued so far
///
/// Only yields, so paused time does not move.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Encoder that prefixes text, so tests can tell encoded output apart
pub fn tagged_encoder(value: &String) -> WsMessage {
    WsMessage::Text(format!("out:{}", value))
}

/// Decoder accepting text frames only
pub fn text_decoder(message: &WsMessage) -> std::result::Result<String, String> {
    message
        .as_text()
        .map(str::to_owned)
        .ok_or_else(|| "binary frame".to_string())
}
