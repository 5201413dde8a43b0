//! Registry of connected clients.

use std::collections::HashMap;
use std::sync::Arc;

use livescore_core::ConnectionId;
use parking_lot::Mutex;

use super::handle::ConnectionHandle;

/// The set of currently registered connections, keyed by id.
///
/// Every structural change and every read-for-iteration goes through one
/// mutex. The lock is never held across an `.await`.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ConnectionId, Arc<dyn ConnectionHandle>>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle. Returns `false` if its id was already present, in
    /// which case the existing entry is kept.
    pub fn add(&self, handle: Arc<dyn ConnectionHandle>) -> bool {
        let mut clients = self.clients.lock();
        if clients.contains_key(handle.id()) {
            return false;
        }
        let _ = clients.insert(handle.id().clone(), handle);
        true
    }

    /// Unregister a handle. Returns `false` if it was not present.
    ///
    /// Does not close the handle.
    pub fn remove(&self, id: &ConnectionId) -> bool {
        self.clients.lock().remove(id).is_some()
    }

    /// Point-in-time copy of the registered handles.
    pub fn snapshot(&self) -> Vec<Arc<dyn ConnectionHandle>> {
        self.clients.lock().values().cloned().collect()
    }

    /// Whether a handle with this id is registered.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.clients.lock().contains_key(id)
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    /// Whether no handles are registered.
    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }
}
