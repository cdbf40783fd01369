//! typedsockets server - main library
//!
//! ## Architecture
//!
//! - **typedsockets**: Typed WebSocket server library (re-exported from workspace)
//! - **bin_common**: Common utilities for binary executables (config lookup,
//!   logging, shutdown)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use typedsockets_server::bin_common::{load_config_from_env, ConfigType};
//! use typedsockets_server::typedsockets::ServerConfig;
//! ```

// Re-export workspace library for convenience
pub use typedsockets;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod logging;
    pub mod shutdown;

    pub use cli::{load_config_from_env, ConfigType};
    pub use logging::{init_tracing, init_tracing_with_level};
    pub use shutdown::{print_banner, print_shutdown, ShutdownManager};
}
