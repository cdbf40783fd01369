//! # typedsockets
//!
//! Typed WebSocket server lifecycle management.
//!
//! ## Features
//!
//! - **Typed handles**: Each peer is a `ClientHandle<S>` that encodes outbound values
//! - **Heartbeat eviction**: Silent peers are probed, then terminated on the next sweep
//! - **Single server loop**: Transport events and sweeps are serialized on one task
//! - **Type-state builder**: Encoder and decoder are required at compile time
//! - **Pluggable transport**: tokio-tungstenite by default, any `Transport` in tests

pub mod traits;
pub mod core;
pub mod manager;

// Re-export all traits
pub use traits::*;

// Re-export core server functionality
pub use self::core::{
    builder, client, config, events, heartbeat, metrics, server, ws_transport,
    builder::{states, ServerBuilder},
    client::ClientHandle,
    config::{ConfigError, ListenOptions, ServerConfig},
    events::{EventBus, ServerEvent},
    heartbeat::{HeartbeatMonitor, SweepReport},
    metrics::{AtomicMetrics, Metrics},
    server::Server,
    ws_transport::{TungsteniteConnection, TungsteniteTransport},
};

// Re-export manager
pub use manager::Registry;

// Convenience function
pub use self::core::builder as server_builder;
