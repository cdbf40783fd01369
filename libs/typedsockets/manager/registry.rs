use crate::core::client::ClientHandle;
use crate::traits::ConnectionId;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps connection identities to their typed handles
///
/// Owned by the server. Entries are inserted when the transport reports a new
/// connection and removed only when it reports that connection's close; there
/// is no implicit cleanup. Lookups for unknown ids are expected (a peer can be
/// terminated while its last frames are still queued) and simply miss.
pub struct Registry<S> {
    clients: HashMap<ConnectionId, Arc<ClientHandle<S>>>,
}

impl<S> Registry<S> {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Insert a handle under its connection id
    ///
    /// Returns the previous handle if the transport reused a live id.
    pub fn insert(&mut self, handle: Arc<ClientHandle<S>>) -> Option<Arc<ClientHandle<S>>> {
        self.clients.insert(handle.id(), handle)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Arc<ClientHandle<S>>> {
        self.clients.get(&id)
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<Arc<ClientHandle<S>>> {
        self.clients.remove(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Iterate over all registered handles
    pub fn handles(&self) -> impl Iterator<Item = &Arc<ClientHandle<S>>> {
        self.clients.values()
    }

    /// Owned copy of all handles
    pub fn snapshot(&self) -> Vec<Arc<ClientHandle<S>>> {
        self.clients.values().cloned().collect()
    }
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self::new()
    }
}
