//! Encode/decode contract
//!
//! The server is generic over an outbound type `S` and an inbound type `R`.
//! An [`Encoder<S>`] turns values into [`WsMessage`]s and must be total;
//! a [`Decoder<R>`] may fail, and its failures are swallowed by the server
//! (the offending message is dropped, the connection stays open).
//!
//! Plain closures implement both traits:
//!
//! ```ignore
//! let server = typedsockets::builder()
//!     .encoder(|value: &Outbound| WsMessage::Text(value.to_string()))
//!     .decoder(|msg: &WsMessage| msg.as_text().ok_or("not text").map(str::to_owned))
//!     .build(transport)
//!     .await?;
//! ```

use crate::error::{Result, SocketError};
use crate::message::WsMessage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::marker::PhantomData;

/// Turns outbound values into wire messages
pub trait Encoder<S>: Send + Sync {
    /// Encode a value. Must be pure and must not fail.
    fn encode(&self, value: &S) -> WsMessage;
}

/// Turns wire messages into inbound values
pub trait Decoder<R>: Send + Sync {
    /// Decode a message.
    ///
    /// # Returns
    /// * `Ok(value)` - Message understood, emitted as a `message` event
    /// * `Err(SocketError::Decode)` - Message dropped without further effect
    fn decode(&self, message: &WsMessage) -> Result<R>;
}

impl<S, F> Encoder<S> for F
where
    F: Fn(&S) -> WsMessage + Send + Sync + 'static,
{
    fn encode(&self, value: &S) -> WsMessage {
        self(value)
    }
}

impl<R, E, F> Decoder<R> for F
where
    F: Fn(&WsMessage) -> std::result::Result<R, E> + Send + Sync + 'static,
    E: Display,
{
    fn decode(&self, message: &WsMessage) -> Result<R> {
        self(message).map_err(|e| SocketError::Decode(e.to_string()))
    }
}

/// JSON codec over serde
///
/// Encodes to `Text` frames. Decodes both `Text` and `Binary` frames, since
/// either carries UTF-8 JSON depending on the peer.
///
/// An encoder that fails to serialize is a programming error for this crate
/// (encoders are total), so a serialization failure degrades to the JSON
/// literal `null` and is logged.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Encoder<T> for JsonCodec<T>
where
    T: Serialize + 'static,
{
    fn encode(&self, value: &T) -> WsMessage {
        match serde_json::to_string(value) {
            Ok(json) => WsMessage::Text(json),
            Err(e) => {
                tracing::error!("JSON encoder failed: {}", e);
                WsMessage::Text("null".to_string())
            }
        }
    }
}

impl<T> Decoder<T> for JsonCodec<T>
where
    T: DeserializeOwned + 'static,
{
    fn decode(&self, message: &WsMessage) -> Result<T> {
        serde_json::from_slice(message.as_bytes()).map_err(|e| SocketError::Decode(e.to_string()))
    }
}
