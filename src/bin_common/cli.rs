//! CLI utilities for binaries
//!
//! Handles configuration path lookup and environment variables
//! for all binary executables.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Server configuration (config/server.yaml)
    Server,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Server => "config/server.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Server => "SERVER_CONFIG_PATH",
            ConfigType::Custom(_) => "CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
///
/// Variables from a `.env` file in the working directory are honoured.
///
/// # Examples
/// ```
/// use typedsockets_server::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Server);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    dotenv::dotenv().ok();

    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}
