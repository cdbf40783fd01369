//! Canonical message representation
//!
//! Everything that crosses the codec boundary is normalized to a [`WsMessage`].
//! One conversion rule exists per admissible source representation:
//!
//! | Source                          | Result                    |
//! |---------------------------------|---------------------------|
//! | `String`, `&str`                | `Text` (UTF-8)            |
//! | `Vec<u8>`, `&[u8]`, `[u8; N]`   | `Binary` (copied as-is)   |
//!
//! [`WsMessage::as_bytes`] gives the byte view of either variant.

/// Text or binary payload of a single data frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(_) => None,
        }
    }

    /// Get the message as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            WsMessage::Text(_) => None,
            WsMessage::Binary(b) => Some(b),
        }
    }

    /// Byte view of the payload, regardless of variant
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            WsMessage::Text(s) => s.as_bytes(),
            WsMessage::Binary(b) => b,
        }
    }

    /// Consume the message into its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            WsMessage::Text(s) => s.into_bytes(),
            WsMessage::Binary(b) => b,
        }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if message is text
    pub fn is_text(&self) -> bool {
        matches!(self, WsMessage::Text(_))
    }

    /// Check if message is binary
    pub fn is_binary(&self) -> bool {
        matches!(self, WsMessage::Binary(_))
    }
}

impl From<String> for WsMessage {
    fn from(text: String) -> Self {
        WsMessage::Text(text)
    }
}

impl From<&str> for WsMessage {
    fn from(text: &str) -> Self {
        WsMessage::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for WsMessage {
    fn from(data: Vec<u8>) -> Self {
        WsMessage::Binary(data)
    }
}

impl From<&[u8]> for WsMessage {
    fn from(data: &[u8]) -> Self {
        WsMessage::Binary(data.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for WsMessage {
    fn from(data: [u8; N]) -> Self {
        WsMessage::Binary(data.to_vec())
    }
}
