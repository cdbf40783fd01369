//! Typed lifecycle event dispatch
//!
//! The server owns one [`EventBus`]. Each event kind keeps its own ordered
//! listener list; emission calls every listener synchronously, in
//! registration order, on the server loop.
//!
//! | Event           | Payload                 |
//! |-----------------|-------------------------|
//! | `listening`     | -                       |
//! | `connection`    | handle                  |
//! | `message`       | handle, decoded value   |
//! | `disconnection` | handle                  |
//! | `close`         | -                       |
//!
//! Listeners are snapshotted before each emission, so a listener may register
//! further listeners without deadlocking; those take effect from the next
//! emission.
//!
//! `listening` is dispatched before `build()` returns, so only listeners
//! registered on the builder receive it.

use crate::core::client::ClientHandle;
use crossbeam_channel::{unbounded, Receiver};
use parking_lot::RwLock;
use std::sync::Arc;

type SignalFn = dyn Fn() + Send + Sync;
type ClientFn<S> = dyn Fn(&Arc<ClientHandle<S>>) + Send + Sync;
type MessageFn<S, R> = dyn Fn(&Arc<ClientHandle<S>>, &R) + Send + Sync;

/// Owned form of every event, for channel-based consumers
pub enum ServerEvent<S, R> {
    Listening,
    Connection(Arc<ClientHandle<S>>),
    Message(Arc<ClientHandle<S>>, R),
    Disconnection(Arc<ClientHandle<S>>),
    Close,
}

impl<S, R: std::fmt::Debug> std::fmt::Debug for ServerEvent<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerEvent::Listening => f.write_str("Listening"),
            ServerEvent::Connection(h) => f.debug_tuple("Connection").field(&h.id()).finish(),
            ServerEvent::Message(h, value) => f
                .debug_tuple("Message")
                .field(&h.id())
                .field(value)
                .finish(),
            ServerEvent::Disconnection(h) => {
                f.debug_tuple("Disconnection").field(&h.id()).finish()
            }
            ServerEvent::Close => f.write_str("Close"),
        }
    }
}

/// Ordered listener list for one event kind
struct Listeners<F: ?Sized> {
    list: RwLock<Vec<Arc<F>>>,
}

impl<F: ?Sized> Listeners<F> {
    fn new() -> Self {
        Self {
            list: RwLock::new(Vec::new()),
        }
    }

    fn add(&self, listener: Arc<F>) {
        self.list.write().push(listener);
    }

    fn snapshot(&self) -> Vec<Arc<F>> {
        self.list.read().clone()
    }

    fn len(&self) -> usize {
        self.list.read().len()
    }
}

/// Multi-listener dispatcher for server lifecycle events
///
/// # Type Parameters
/// - `S`: Outbound message type (carried by client handles)
/// - `R`: Inbound message type (payload of `message`)
pub struct EventBus<S, R> {
    listening: Listeners<SignalFn>,
    connection: Listeners<ClientFn<S>>,
    message: Listeners<MessageFn<S, R>>,
    disconnection: Listeners<ClientFn<S>>,
    close: Listeners<SignalFn>,
}

impl<S, R> EventBus<S, R> {
    pub fn new() -> Self {
        Self {
            listening: Listeners::new(),
            connection: Listeners::new(),
            message: Listeners::new(),
            disconnection: Listeners::new(),
            close: Listeners::new(),
        }
    }

    /// Total number of registered listeners across all events
    pub fn listener_count(&self) -> usize {
        self.listening.len()
            + self.connection.len()
            + self.message.len()
            + self.disconnection.len()
            + self.close.len()
    }

    pub(crate) fn emit_listening(&self) {
        for listener in self.listening.snapshot() {
            listener();
        }
    }

    pub(crate) fn emit_connection(&self, handle: &Arc<ClientHandle<S>>) {
        for listener in self.connection.snapshot() {
            listener(handle);
        }
    }

    pub(crate) fn emit_message(&self, handle: &Arc<ClientHandle<S>>, value: &R) {
        for listener in self.message.snapshot() {
            listener(handle, value);
        }
    }

    pub(crate) fn emit_disconnection(&self, handle: &Arc<ClientHandle<S>>) {
        for listener in self.disconnection.snapshot() {
            listener(handle);
        }
    }

    pub(crate) fn emit_close(&self) {
        for listener in self.close.snapshot() {
            listener();
        }
    }
}

impl<S: 'static, R: 'static> EventBus<S, R> {
    /// Only useful on the builder; a running server has already listened
    pub fn on_listening<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listening.add(Arc::new(listener));
    }

    pub fn on_connection<F>(&self, listener: F)
    where
        F: Fn(&Arc<ClientHandle<S>>) + Send + Sync + 'static,
    {
        self.connection.add(Arc::new(listener));
    }

    pub fn on_message<F>(&self, listener: F)
    where
        F: Fn(&Arc<ClientHandle<S>>, &R) + Send + Sync + 'static,
    {
        self.message.add(Arc::new(listener));
    }

    pub fn on_disconnection<F>(&self, listener: F)
    where
        F: Fn(&Arc<ClientHandle<S>>) + Send + Sync + 'static,
    {
        self.disconnection.add(Arc::new(listener));
    }

    pub fn on_close<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.close.add(Arc::new(listener));
    }
}

impl<S, R> EventBus<S, R>
where
    S: 'static,
    R: Clone + Send + 'static,
{
    /// Forward every event into an unbounded channel
    ///
    /// Useful for consumers on their own thread. Subscribing to a running
    /// server never yields [`ServerEvent::Listening`]. The forwarding listeners stay
    /// registered for the lifetime of the bus; sends to a dropped receiver are
    /// ignored.
    pub fn subscribe(&self) -> Receiver<ServerEvent<S, R>> {
        let (tx, rx) = unbounded();

        let sender = tx.clone();
        self.on_listening(move || {
            let _ = sender.send(ServerEvent::Listening);
        });

        let sender = tx.clone();
        self.on_connection(move |handle| {
            let _ = sender.send(ServerEvent::Connection(Arc::clone(handle)));
        });

        let sender = tx.clone();
        self.on_message(move |handle, value: &R| {
            let _ = sender.send(ServerEvent::Message(Arc::clone(handle), value.clone()));
        });

        let sender = tx.clone();
        self.on_disconnection(move |handle| {
            let _ = sender.send(ServerEvent::Disconnection(Arc::clone(handle)));
        });

        self.on_close(move || {
            let _ = tx.send(ServerEvent::Close);
        });

        rx
    }
}

impl<S, R> Default for EventBus<S, R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::tests::{text_encoder, RecordingConnection};
    use parking_lot::Mutex;

    fn handle(id: u64) -> Arc<ClientHandle<String>> {
        Arc::new(ClientHandle::new(RecordingConnection::new(id), text_encoder()))
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let bus = EventBus::<String, u32>::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.on_message(move |_, value| {
                order.lock().push(format!("{tag}:{value}"));
            });
        }

        bus.emit_message(&handle(1), &5);

        assert_eq!(*order.lock(), vec!["first:5", "second:5", "third:5"]);
    }

    #[test]
    fn test_events_only_reach_their_listeners() {
        let bus = EventBus::<String, u32>::new();
        let hits = Arc::new(Mutex::new(Vec::new()));

        let h = Arc::clone(&hits);
        bus.on_connection(move |c| h.lock().push(("connection", c.id())));
        let h = Arc::clone(&hits);
        bus.on_disconnection(move |c| h.lock().push(("disconnection", c.id())));

        bus.emit_connection(&handle(3));
        bus.emit_listening();
        bus.emit_close();
        bus.emit_disconnection(&handle(4));

        assert_eq!(*hits.lock(), vec![("connection", 3), ("disconnection", 4)]);
        assert_eq!(bus.listener_count(), 2);
    }

    #[test]
    fn test_listener_may_register_listener() {
        let bus = Arc::new(EventBus::<String, u32>::new());
        let count = Arc::new(Mutex::new(0));

        let inner_bus = Arc::clone(&bus);
        let inner_count = Arc::clone(&count);
        bus.on_listening(move || {
            let c = Arc::clone(&inner_count);
            inner_bus.on_close(move || *c.lock() += 1);
        });

        bus.emit_listening();
        bus.emit_close();

        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_subscribe_forwards_every_event() {
        let bus = EventBus::<String, u32>::new();
        let rx = bus.subscribe();
        let client = handle(8);

        bus.emit_listening();
        bus.emit_connection(&client);
        bus.emit_message(&client, &42);
        bus.emit_disconnection(&client);
        bus.emit_close();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], ServerEvent::Listening));
        assert!(matches!(&events[1], ServerEvent::Connection(h) if h.id() == 8));
        assert!(matches!(&events[2], ServerEvent::Message(h, 42) if h.id() == 8));
        assert!(matches!(&events[3], ServerEvent::Disconnection(h) if h.id() == 8));
        assert!(matches!(events[4], ServerEvent::Close));
    }
}
