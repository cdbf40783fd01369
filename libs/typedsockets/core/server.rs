use crate::config::ServerConfig;
use crate::core::client::ClientHandle;
use crate::core::events::{EventBus, ServerEvent};
use crate::core::heartbeat::{self, HeartbeatMonitor};
use crate::core::metrics::{AtomicMetrics, Metrics};
use crate::manager::Registry;
use crate::traits::*;
use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

/// State shared between the server loop and the [`Server`] facade
///
/// Only the loop mutates the registry; the facade reads it.
pub(crate) struct Shared<S, R> {
    pub(crate) registry: RwLock<Registry<S>>,
    pub(crate) events: EventBus<S, R>,
    pub(crate) encoder: Arc<dyn Encoder<S>>,
    pub(crate) decoder: Arc<dyn Decoder<R>>,
    pub(crate) metrics: AtomicMetrics,
    pub(crate) config: ServerConfig,
}

/// Typed WebSocket server with heartbeat-based dead-peer eviction
///
/// The server consumes a [`Transport`]'s notifications on one task (the
/// server loop), keeps a [`ClientHandle`] per live connection, decodes inbound
/// frames with the configured [`Decoder`], and dispatches lifecycle events
/// through its [`EventBus`].
///
/// # Type Parameters
/// - `S`: Outbound message type, encoded by the server's [`Encoder`]
/// - `R`: Inbound message type, produced by the server's [`Decoder`]
pub struct Server<S, R> {
    shared: Arc<Shared<S, R>>,
    transport: Arc<dyn Transport>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl<S, R> Server<S, R>
where
    S: Send + Sync + 'static,
    R: Send + 'static,
{
    /// Spawn the server loop and start the transport
    ///
    /// This is called by the builder's `build()` method. It returns once the
    /// loop has dispatched `listening`, so only listeners registered on the
    /// builder ever see that event.
    pub(crate) async fn start(shared: Shared<S, R>, transport: Arc<dyn Transport>) -> Result<Self> {
        let shared = Arc::new(shared);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        // The first sweep is one full interval after start, not after the
        // loop's first poll
        let heartbeat = HeartbeatMonitor::new(shared.config.heartbeat_interval());

        let task_handle = {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                run_server(shared, events_rx, heartbeat, ready_tx).await;
            })
        };

        if let Err(e) = transport.listen(events_tx).await {
            task_handle.abort();
            return Err(e);
        }

        // The sender is dropped if the loop ends without seeing `Listening`
        if ready_rx.await.is_err() {
            task_handle.abort();
            return Err(SocketError::Transport(
                "transport stopped before reporting listening".to_string(),
            ));
        }

        Ok(Self {
            shared,
            transport,
            task_handle: Some(task_handle),
        })
    }

    /// Encode `value` once and write the same message to every client
    ///
    /// Returns the number of clients written to.
    pub fn send_to_all(&self, value: &S) -> usize {
        let message = self.shared.encoder.encode(value);
        let registry = self.shared.registry.read();

        for handle in registry.handles() {
            handle.send_encoded(message.clone());
        }

        self.shared.metrics.increment_broadcasts();
        registry.len()
    }

    /// Look up a client by connection id
    pub fn client(&self, id: ConnectionId) -> Option<Arc<ClientHandle<S>>> {
        self.shared.registry.read().get(id).cloned()
    }

    /// Snapshot of all connected clients
    pub fn clients(&self) -> Vec<Arc<ClientHandle<S>>> {
        self.shared.registry.read().snapshot()
    }

    pub fn client_count(&self) -> usize {
        self.shared.registry.read().len()
    }

    /// Listener registration for lifecycle events
    pub fn events(&self) -> &EventBus<S, R> {
        &self.shared.events
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    pub fn metrics(&self) -> Metrics {
        self.shared.metrics.snapshot()
    }

    /// Stop accepting connections
    ///
    /// Once the transport confirms, the heartbeat stops and `close` is
    /// emitted. Already-connected clients are left alone.
    pub fn close(&self) {
        info!("Closing server");
        self.transport.shutdown();
    }

    /// Wait for the server loop to finish
    ///
    /// The loop ends once the transport has dropped every event sender, i.e.
    /// it stopped accepting and all of its connections are gone.
    pub async fn join(mut self) -> Result<()> {
        if let Some(handle) = self.task_handle.take() {
            handle.await.map_err(|e| SocketError::Task(e.to_string()))?;
        }
        Ok(())
    }
}

impl<S, R> Server<S, R>
where
    S: Send + Sync + 'static,
    R: Clone + Send + 'static,
{
    /// Receive every event on an unbounded channel
    pub fn subscribe(&self) -> Receiver<ServerEvent<S, R>> {
        self.shared.events.subscribe()
    }
}

impl<S, R> std::fmt::Debug for Server<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("clients", &self.shared.registry.read().len())
            .field("config", &self.shared.config)
            .finish()
    }
}

/// Main server task loop
///
/// Transport notifications and heartbeat ticks are handled one at a time on
/// this task; nothing else mutates the registry.
async fn run_server<S, R>(
    shared: Arc<Shared<S, R>>,
    mut events: TransportReceiver,
    heartbeat: HeartbeatMonitor,
    ready: oneshot::Sender<()>,
) where
    S: Send + Sync + 'static,
    R: Send + 'static,
{
    let mut heartbeat = Some(heartbeat);
    let mut ready = Some(ready);
    let mut closed = false;

    loop {
        tokio::select! {
            biased;

            event = events.recv() => {
                match event {
                    Some(TransportEvent::Listening) => {
                        shared.handle_event(TransportEvent::Listening);
                        if let Some(ready) = ready.take() {
                            let _ = ready.send(());
                        }
                    }
                    Some(TransportEvent::Closed) => {
                        if !closed {
                            closed = true;
                            // Dropping the monitor cancels the timer
                            heartbeat = None;
                            info!("Transport closed, heartbeat stopped");
                            shared.events.emit_close();
                        }
                    }
                    Some(event) => shared.handle_event(event),
                    None => {
                        debug!("Transport event channel closed");
                        break;
                    }
                }
            }

            _ = next_tick(&mut heartbeat) => {
                shared.run_sweep();
            }
        }
    }

    info!("Server task exiting");
}

async fn next_tick(heartbeat: &mut Option<HeartbeatMonitor>) {
    match heartbeat {
        Some(monitor) => monitor.tick().await,
        None => std::future::pending().await,
    }
}

impl<S, R> Shared<S, R> {
    fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Listening => {
                info!("Server listening");
                self.events.emit_listening();
            }
            TransportEvent::Connection(connection) => self.register(connection),
            TransportEvent::Message { id, message } => self.on_message(id, message),
            TransportEvent::Pong { id } => self.on_pong(id),
            TransportEvent::Close { id } => self.on_close(id),
            // Handled by the loop, which owns the heartbeat
            TransportEvent::Closed => {}
        }
    }

    fn register(&self, connection: Arc<dyn Connection>) {
        let id = connection.id();
        if self.registry.read().contains(id) {
            // Transports must not reuse a live id; the first handle stays
            warn!("Connection id {} reused while still registered, ignoring", id);
            return;
        }

        let handle = Arc::new(ClientHandle::new(connection, Arc::clone(&self.encoder)));
        self.registry.write().insert(Arc::clone(&handle));

        self.metrics.increment_connections();
        debug!("Client {} connected", id);
        self.events.emit_connection(&handle);
    }

    fn lookup(&self, id: ConnectionId) -> Option<Arc<ClientHandle<S>>> {
        self.registry.read().get(id).cloned()
    }

    fn on_message(&self, id: ConnectionId, message: WsMessage) {
        let Some(handle) = self.lookup(id) else {
            // Terminated or closed while the frame was in flight
            trace!("Dropping message for unknown connection {}", id);
            return;
        };

        handle.mark_alive();
        self.metrics.increment_received();

        // Undecodable input is peer noise: no event, no log, connection stays up
        match self.decoder.decode(&message) {
            Ok(value) => self.events.emit_message(&handle, &value),
            Err(_) => self.metrics.increment_decode_failures(),
        }
    }

    fn on_pong(&self, id: ConnectionId) {
        if !self.config.pong_resets_liveness {
            return;
        }
        if let Some(handle) = self.lookup(id) {
            handle.mark_alive();
        }
    }

    fn on_close(&self, id: ConnectionId) {
        let Some(handle) = self.lookup(id) else {
            trace!("Close for unknown connection {}", id);
            return;
        };

        self.events.emit_disconnection(&handle);
        self.registry.write().remove(id);
        self.metrics.increment_disconnections();
        debug!("Client {} disconnected", id);
    }

    fn run_sweep(&self) {
        let report = heartbeat::sweep(&self.registry.read());
        self.metrics.add_probes(report.probed);
        self.metrics.add_terminations(report.terminated);

        if report.terminated > 0 {
            debug!(
                "Heartbeat sweep: {} probed, {} terminated",
                report.probed, report.terminated
            );
        } else {
            trace!("Heartbeat sweep: {} probed", report.probed);
        }
    }
}
