pub mod states;

use crate::config::{ListenOptions, ServerConfig};
use crate::core::client::ClientHandle;
use crate::core::events::EventBus;
use crate::core::metrics::AtomicMetrics;
use crate::core::server::{Server, Shared};
use crate::core::ws_transport::TungsteniteTransport;
use crate::manager::Registry;
use crate::traits::*;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use states::*;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for [`Server`]
///
/// This builder uses Rust's type system to enforce that both halves of the
/// codec (encoder and decoder) are set before the server can be built.
///
/// Event listeners can be attached once both message types are known, which
/// guarantees they are in place before the transport reports anything.
pub struct ServerBuilder<E, D, S, R>
where
    E: EncoderState,
    D: DecoderState,
{
    _state: TypeState<E, D>,
    encoder: Option<Arc<dyn Encoder<S>>>,
    decoder: Option<Arc<dyn Decoder<R>>>,
    config: ServerConfig,
    events: EventBus<S, R>,
}

impl ServerBuilder<NoEncoder, NoDecoder, (), ()> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            encoder: None,
            decoder: None,
            config: ServerConfig::default(),
            events: EventBus::new(),
        }
    }

    /// Use [`JsonCodec`] for both directions
    pub fn json<NewS, NewR>(self) -> ServerBuilder<HasEncoder, HasDecoder, NewS, NewR>
    where
        NewS: Serialize + 'static,
        NewR: DeserializeOwned + 'static,
    {
        ServerBuilder {
            _state: TypeState::new(),
            encoder: Some(Arc::new(JsonCodec::<NewS>::new())),
            decoder: Some(Arc::new(JsonCodec::<NewR>::new())),
            config: self.config,
            events: EventBus::new(),
        }
    }
}

impl Default for ServerBuilder<NoEncoder, NoDecoder, (), ()> {
    fn default() -> Self {
        Self::new()
    }
}

// Encoder setting
impl<D, R> ServerBuilder<NoEncoder, D, (), R>
where
    D: DecoderState,
{
    pub fn encoder<NewS>(
        self,
        encoder: impl Encoder<NewS> + 'static,
    ) -> ServerBuilder<HasEncoder, D, NewS, R>
    where
        NewS: 'static,
    {
        ServerBuilder {
            _state: TypeState::new(),
            encoder: Some(Arc::new(encoder)),
            decoder: self.decoder,
            config: self.config,
            // No listeners can exist before both types are set
            events: EventBus::new(),
        }
    }
}

// Decoder setting
impl<E, S> ServerBuilder<E, NoDecoder, S, ()>
where
    E: EncoderState,
{
    pub fn decoder<NewR>(
        self,
        decoder: impl Decoder<NewR> + 'static,
    ) -> ServerBuilder<E, HasDecoder, S, NewR>
    where
        NewR: 'static,
    {
        ServerBuilder {
            _state: TypeState::new(),
            encoder: self.encoder,
            decoder: Some(Arc::new(decoder)),
            config: self.config,
            events: EventBus::new(),
        }
    }
}

// Optional configuration methods
impl<E, D, S, R> ServerBuilder<E, D, S, R>
where
    E: EncoderState,
    D: DecoderState,
{
    /// Period between heartbeat sweeps (default 5s)
    ///
    /// Sub-millisecond periods round up to 1ms; zero is rejected at build.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval_ms =
            u64::try_from(interval.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX);
        self
    }

    /// Whether protocol-level pongs count as liveness (default true)
    pub fn pong_resets_liveness(mut self, enabled: bool) -> Self {
        self.config.pong_resets_liveness = enabled;
        self
    }

    /// Listen options used by [`ServerBuilder::listen`]
    pub fn listen_options(mut self, options: ListenOptions) -> Self {
        self.config.listen = options;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }
}

// Listener registration - only once both message types are known
impl<S, R> ServerBuilder<HasEncoder, HasDecoder, S, R>
where
    S: 'static,
    R: 'static,
{
    pub fn on_listening<F>(self, listener: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.events.on_listening(listener);
        self
    }

    pub fn on_connection<F>(self, listener: F) -> Self
    where
        F: Fn(&Arc<ClientHandle<S>>) + Send + Sync + 'static,
    {
        self.events.on_connection(listener);
        self
    }

    pub fn on_message<F>(self, listener: F) -> Self
    where
        F: Fn(&Arc<ClientHandle<S>>, &R) + Send + Sync + 'static,
    {
        self.events.on_message(listener);
        self
    }

    pub fn on_disconnection<F>(self, listener: F) -> Self
    where
        F: Fn(&Arc<ClientHandle<S>>) + Send + Sync + 'static,
    {
        self.events.on_disconnection(listener);
        self
    }

    pub fn on_close<F>(self, listener: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.events.on_close(listener);
        self
    }
}

// Build methods - only available when encoder and decoder are set
impl<S, R> ServerBuilder<HasEncoder, HasDecoder, S, R>
where
    S: Send + Sync + 'static,
    R: Send + 'static,
{
    /// Start the server on a custom transport
    pub async fn build<T>(self, transport: Arc<T>) -> Result<Server<S, R>>
    where
        T: Transport,
    {
        self.config
            .validate()
            .map_err(|e| SocketError::Configuration(e.to_string()))?;

        let (Some(encoder), Some(decoder)) = (self.encoder, self.decoder) else {
            return Err(SocketError::Configuration(
                "encoder and decoder must both be set".to_string(),
            ));
        };

        let shared = Shared {
            registry: RwLock::new(Registry::new()),
            events: self.events,
            encoder,
            decoder,
            metrics: AtomicMetrics::new(),
            config: self.config,
        };

        Server::start(shared, transport).await
    }

    /// Start the server on the bundled WebSocket transport, using the
    /// configured listen options
    pub async fn listen(self) -> Result<Server<S, R>> {
        let transport = Arc::new(TungsteniteTransport::new(self.config.listen.clone()));
        self.build(transport).await
    }
}
