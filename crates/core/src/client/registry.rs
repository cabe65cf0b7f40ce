use super::record::ClientRecord;
use crate::client::ClientId;
use crate::hooks::EventHooks;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Client Registry (component A): creates and destroys [`ClientRecord`]s,
/// and answers presence queries.
///
/// `on_connect`/`on_disconnect` are always invoked after the map lock has
/// been released, so a hook that reenters the registry (e.g. to inspect
/// `present`) cannot deadlock.
pub struct ClientRegistry {
    clients: RwLock<HashMap<ClientId, Arc<ClientRecord>>>,
    hooks: Arc<dyn EventHooks>,
    client_timeout: Duration,
}

impl ClientRegistry {
    pub fn new(client_timeout: Duration, hooks: Arc<dyn EventHooks>) -> Arc<Self> {
        Arc::new(Self {
            clients: RwLock::new(HashMap::new()),
            hooks,
            client_timeout,
        })
    }

    /// If `id` is unknown, creates the record and starts its watchdog. If
    /// `id` is already connected, just refreshes its heartbeat; no duplicate
    /// record is created and `on_connect` does not fire again.
    pub fn connect(self: &Arc<Self>, id: ClientId) {
        let (record, is_new) = {
            let mut clients = self.clients.write();
            if let Some(existing) = clients.get(&id) {
                existing.touch_heartbeat();
                (existing.clone(), false)
            } else {
                let record = ClientRecord::create(id.clone());
                clients.insert(id.clone(), record.clone());
                (record, true)
            }
        };
        if is_new {
            record.spawn_watchdog(Arc::downgrade(self), self.client_timeout);
            self.hooks.on_connect(&id);
        }
    }

    /// Unknown ids succeed silently. A known id is removed, its watchdog
    /// cancelled, and a wake sentinel enqueued so any in-flight `receive`
    /// unblocks promptly.
    pub fn disconnect(&self, id: &ClientId) {
        let removed = self.clients.write().remove(id);
        if let Some(record) = removed {
            record.cancel_watchdog();
            record.wake();
            self.hooks.on_disconnect(id);
        }
    }

    pub fn present(&self, id: &ClientId) -> bool {
        self.clients.read().contains_key(id)
    }

    pub(crate) fn get(&self, id: &ClientId) -> Option<Arc<ClientRecord>> {
        self.clients.read().get(id).cloned()
    }

    /// A snapshot of currently connected client ids.
    pub fn iterate(&self) -> Vec<ClientId> {
        self.clients.read().keys().cloned().collect()
    }
}
