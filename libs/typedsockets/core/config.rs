use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Default sweep period, in milliseconds
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 5000;

/// Default wait for the peer's close reply, in milliseconds
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 30_000;

/// Server behaviour configuration
///
/// Everything except `listen` is interpreted by the server itself; `listen`
/// is handed through to the transport.
///
/// ```yaml
/// heartbeat_interval_ms: 5000
/// pong_resets_liveness: true
/// listen:
///   host: 0.0.0.0
///   port: 8080
///   path: /ws
///   close_timeout_ms: 30000
///   max_message_size: 1048576
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Period between liveness sweeps
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Whether a protocol-level pong counts as liveness.
    ///
    /// When false, only application messages keep a peer alive, so a peer
    /// that answers probes but never sends data is dropped after two sweeps.
    #[serde(default = "default_true")]
    pub pong_resets_liveness: bool,

    /// Transport listen options
    #[serde(default)]
    pub listen: ListenOptions,
}

/// Where and how the transport accepts connections
///
/// The bundled transport speaks plain `ws://` only. TLS is expected to be
/// terminated in front of it (reverse proxy or load balancer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenOptions {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Only accept upgrades on this request path (any path when unset)
    #[serde(default)]
    pub path: Option<String>,

    /// How long a closing connection waits for the peer's close frame
    /// before the socket is dropped
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,

    /// Largest inbound message in bytes (tungstenite's default when unset)
    #[serde(default)]
    pub max_message_size: Option<usize>,

    /// Largest inbound frame in bytes (tungstenite's default when unset)
    #[serde(default)]
    pub max_frame_size: Option<usize>,
}

fn default_heartbeat_interval_ms() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_close_timeout_ms() -> u64 {
    DEFAULT_CLOSE_TIMEOUT_MS
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: None,
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
            max_message_size: None,
            max_frame_size: None,
        }
    }
}

impl ListenOptions {
    /// `host:port` string suitable for binding
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            pong_resets_liveness: true,
            listen: ListenOptions::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from YAML file
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        Self::from_yaml(&yaml_content)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "heartbeat_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.listen.host.is_empty() {
            return Err(ConfigError::ValidationError(
                "listen.host must not be empty".to_string(),
            ));
        }

        if let Some(path) = &self.listen.path {
            if !path.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "listen.path must start with '/': {}",
                    path
                )));
            }
        }

        if self.listen.close_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "listen.close_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if let (Some(message), Some(frame)) =
            (self.listen.max_message_size, self.listen.max_frame_size)
        {
            if frame > message {
                return Err(ConfigError::ValidationError(format!(
                    "listen.max_frame_size ({}) exceeds listen.max_message_size ({})",
                    frame, message
                )));
            }
        }

        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}
