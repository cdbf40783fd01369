use thiserror::Error;

/// Main error type for typedsockets
#[derive(Error, Debug)]
pub enum SocketError {
    /// Transport could not start or stopped abnormally
    #[error("Transport error: {0}")]
    Transport(String),

    /// WebSocket handshake or frame error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Inbound message could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Server loop terminated abnormally
    #[error("Server task failed: {0}")]
    Task(String),
}

impl From<std::io::Error> for SocketError {
    fn from(err: std::io::Error) -> Self {
        SocketError::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SocketError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SocketError::WebSocket(err.to_string())
    }
}

/// Result type for typedsockets operations
pub type Result<T> = std::result::Result<T, SocketError>;
