//! # typedsockets server
//!
//! A typed lifecycle layer over a WebSocket transport: per-client handles,
//! a connection registry, heartbeat-based dead-peer eviction and a typed
//! event surface.
//!
//! ## Example
//!
//! ```rust,ignore
//! use typedsockets::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = typedsockets::builder()
//!         .json::<ChatOut, ChatIn>()
//!         .heartbeat_interval(Duration::from_secs(5))
//!         .listen_options(ListenOptions { port: 9000, ..Default::default() })
//!         .on_connection(|client| info!("client {} joined", client.id()))
//!         .on_message(|client, msg: &ChatIn| client.send(&ChatOut::echo(msg)))
//!         .listen()
//!         .await?;
//!
//!     server.send_to_all(&ChatOut::announcement("welcome"));
//!     server.join().await
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod events;
pub mod heartbeat;
pub mod metrics;
pub mod server;
pub mod ws_transport;

// Re-export main types
pub use builder::{states, ServerBuilder};
pub use client::ClientHandle;
pub use config::{ConfigError, ListenOptions, ServerConfig};
pub use events::{EventBus, ServerEvent};
pub use heartbeat::{HeartbeatMonitor, SweepReport};
pub use metrics::{AtomicMetrics, Metrics};
pub use server::Server;
pub use ws_transport::{TungsteniteConnection, TungsteniteTransport};

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new server builder
///
/// This is a convenience function for starting the builder pattern.
///
/// # Example
/// ```ignore
/// let server = typedsockets::builder()
///     .encoder(|update: &PriceUpdate| WsMessage::Text(update.to_string()))
///     .decoder(|msg: &WsMessage| msg.as_text().ok_or("binary").map(str::to_owned))
///     .on_message(|client, text: &String| client.send(&PriceUpdate::ack(text)))
///     .build(transport)
///     .await?;
/// ```
pub fn builder() -> ServerBuilder<states::NoEncoder, states::NoDecoder, (), ()> {
    ServerBuilder::new()
}
