use super::registry::ClientRegistry;
use crate::client::ClientId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::AbortHandle;

/// One element of a [`ClientRecord`]'s inbox: either a real payload or the
/// "wake" sentinel that makes an in-flight receive return immediately with
/// no data (used by both `flush` and `disconnect`).
#[derive(Debug, Clone)]
pub(crate) enum InboxItem {
    Payload(String),
    Wake,
}

/// Multi-producer, single-consumer FIFO of pending outbound payloads.
struct Inbox {
    queue: Mutex<VecDeque<InboxItem>>,
    notify: Notify,
}

impl Inbox {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    fn push(&self, item: InboxItem) {
        self.queue.lock().push_back(item);
        self.notify.notify_one();
    }

    /// Blocks until an item is available. Creating the `notified()` future
    /// before re-checking the queue is load-bearing: `Notify` only buffers
    /// one permit, and creating it first ensures a `push` racing with this
    /// call is never missed.
    async fn pop(&self) -> InboxItem {
        loop {
            let notified = self.notify.notified();
            if let Some(item) = self.queue.lock().pop_front() {
                return item;
            }
            notified.await;
        }
    }
}

/// One per connected push client. Owned by the [`ClientRegistry`]; every
/// other component holds only the `client_id` string and resolves through
/// the registry.
pub struct ClientRecord {
    pub id: ClientId,
    inbox: Inbox,
    last_heartbeat: Mutex<Instant>,
    /// Serializes concurrent `receive` calls for this client: the
    /// correctness requirement behind the timer-plus-sentinel wake scheme.
    pub(crate) receive_mutex: tokio::sync::Mutex<()>,
    watchdog: Mutex<Option<AbortHandle>>,
}

impl ClientRecord {
    fn new(id: ClientId) -> Self {
        Self {
            id,
            inbox: Inbox::new(),
            last_heartbeat: Mutex::new(Instant::now()),
            receive_mutex: tokio::sync::Mutex::new(()),
            watchdog: Mutex::new(None),
        }
    }

    pub(crate) fn create(id: ClientId) -> Arc<Self> {
        Arc::new(Self::new(id))
    }

    pub fn touch_heartbeat(&self) {
        *self.last_heartbeat.lock() = Instant::now();
    }

    pub fn last_heartbeat(&self) -> Instant {
        *self.last_heartbeat.lock()
    }

    pub(crate) fn queue(&self, payload: String) {
        self.inbox.push(InboxItem::Payload(payload));
    }

    pub(crate) fn wake(&self) {
        self.inbox.push(InboxItem::Wake);
    }

    pub(crate) async fn pop(&self) -> InboxItem {
        self.inbox.pop().await
    }

    /// Starts the watchdog that disconnects this client from `registry` if
    /// it falls silent for longer than `client_timeout`. Runs for the life
    /// of the record; [`Self::cancel_watchdog`] stops it on disconnect.
    pub(crate) fn spawn_watchdog(self: &Arc<Self>, registry: Weak<ClientRegistry>, client_timeout: Duration) {
        let rec = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(client_timeout).await;
                if rec.last_heartbeat().elapsed() <= client_timeout {
                    continue;
                }
                let Some(registry) = registry.upgrade() else { break };
                registry.disconnect(&rec.id);
                break;
            }
        });
        *self.watchdog.lock() = Some(handle.abort_handle());
    }

    pub(crate) fn cancel_watchdog(&self) {
        if let Some(handle) = self.watchdog.lock().take() {
            handle.abort();
        }
    }
}
