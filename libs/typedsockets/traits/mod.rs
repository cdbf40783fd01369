//! # typedsockets traits
//!
//! Core traits and types shared by the server and its collaborators:
//!
//! - **WsMessage**: Canonical text/binary payload
//! - **Encoder / Decoder**: Typed send/receive contract
//! - **Transport / Connection**: Boundary to the socket layer
//! - **SocketError**: Crate-wide error type

pub mod codec;
pub mod error;
pub mod message;
pub mod transport;

// Re-export commonly used types
pub use codec::{Decoder, Encoder, JsonCodec};
pub use error::{Result, SocketError};
pub use message::WsMessage;
pub use transport::{
    Connection, ConnectionId, Transport, TransportEvent, TransportReceiver, TransportSender,
};
