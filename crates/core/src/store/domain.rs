//! Domain Worker (component C): a single-threaded executor that owns one
//! domain's durable store and subscriber set, consuming meta-messages
//! strictly in arrival order. Nothing outside this module ever touches a
//! `DomainStore` or a subscriber set directly; that's what makes every
//! mutation here race-free without locks beyond the work queue itself.

use super::persistence::DomainStore;
use crate::client::ClientId;
use crate::error::CollisionKind;
use crate::hooks::EventHooks;
use crate::push::PushCore;
use realtime_client_api_messages::{is_ephemeral, Command, Message, Reserved};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Internal work item consumed by a Domain Worker. Never serialized to the
/// wire.
pub(crate) enum MetaMessage {
    Subscribe(ClientId),
    Unsubscribe(ClientId),
    Messages {
        origin: Option<ClientId>,
        batch: Vec<Message>,
    },
    CheckClients,
    Shutdown(oneshot::Sender<()>),
}

#[derive(Clone)]
pub(crate) struct DomainHandle {
    pub(crate) sender: mpsc::UnboundedSender<MetaMessage>,
}

/// Spawns the worker task and returns a handle to its inbound queue. The
/// task exits (dropping its receiver) either on an explicit `Shutdown` or,
/// per the spec, whenever a work cycle ends with no subscribers left; the
/// dispatcher is responsible for noticing a dead handle and recreating it.
pub(crate) fn spawn(domain: String, db_path: PathBuf, push: Arc<PushCore>, hooks: Arc<dyn EventHooks>) -> DomainHandle {
    let (sender, receiver) = mpsc::unbounded_channel();
    tokio::spawn(run(domain, db_path, push, hooks, receiver));
    DomainHandle { sender }
}

async fn run(
    domain: String,
    db_path: PathBuf,
    push: Arc<PushCore>,
    hooks: Arc<dyn EventHooks>,
    mut receiver: mpsc::UnboundedReceiver<MetaMessage>,
) {
    let path = db_path.join(&domain);
    let store = match DomainStore::open(&path) {
        Ok(store) => store,
        Err(err) => {
            hooks.on_error(&format!("domain {domain}: failed to open store at {}: {err}", path.display()));
            return;
        }
    };
    // Guarantees the store is flushed on every exit path, including an
    // `unwrap`/`panic!` bug elsewhere in this function — a worker that dies
    // without flushing would silently lose whatever the sled write cache
    // hadn't yet synced.
    let _flush_on_exit = scopeguard::guard(&store, |store| store.flush());
    let mut subscribers: HashSet<ClientId> = HashSet::new();

    loop {
        let Some(meta) = receiver.recv().await else { break };
        match meta {
            MetaMessage::Subscribe(client) => {
                subscribers.insert(client.clone());
                replay(&store, &push, &domain, &subscribers, &client);
                broadcast_subscribe_notice(&push, &hooks, &mut subscribers, &domain, &client);
                hooks.on_subscribe(&client, &domain);
            }
            MetaMessage::Unsubscribe(client) => {
                if subscribers.remove(&client) {
                    broadcast_unsubscribe_notice(&push, &hooks, &mut subscribers, &domain, &client);
                }
            }
            MetaMessage::Messages { origin, batch } => {
                apply_and_broadcast(&store, &push, &hooks, &mut subscribers, &domain, origin, batch);
            }
            MetaMessage::CheckClients => {
                subscribers.retain(|id| push.present(id));
            }
            MetaMessage::Shutdown(ack) => {
                let _ = ack.send(());
                break;
            }
        }

        if subscribers.is_empty() {
            break;
        }
    }
}

/// Sends the subscribing client one batch containing a synthetic `create`
/// for every persistent key, followed by `_clients` and `_synced`.
fn replay(store: &DomainStore, push: &PushCore, domain: &str, subscribers: &HashSet<ClientId>, client: &ClientId) {
    let mut batch: Vec<Message> = store
        .iter_all()
        .into_iter()
        .map(|(key, (value, version))| Message::create(domain, key, value, version))
        .collect();

    let clients_json = serde_json::to_string(&subscribers.iter().collect::<Vec<_>>()).expect("Vec<&String> always serializes");
    batch.push(Message::create(domain, Reserved::CLIENTS, clients_json, ""));
    batch.push(Message::create(domain, Reserved::SYNCED, "true", ""));

    let _ = push.queue(client, Message::encode_batch(&batch));
}

fn broadcast_subscribe_notice(
    push: &PushCore,
    hooks: &dyn EventHooks,
    subscribers: &mut HashSet<ClientId>,
    domain: &str,
    new_client: &ClientId,
) {
    let payload = Message::encode_batch(&[Message::create(domain, Reserved::SUBSCRIBE, new_client.clone(), "")]);
    let recipients: Vec<ClientId> = subscribers.iter().filter(|id| *id != new_client).cloned().collect();
    broadcast(push, hooks, subscribers, domain, &recipients, &payload);
}

fn broadcast_unsubscribe_notice(
    push: &PushCore,
    hooks: &dyn EventHooks,
    subscribers: &mut HashSet<ClientId>,
    domain: &str,
    left_client: &ClientId,
) {
    let payload = Message::encode_batch(&[Message::create(domain, Reserved::UNSUBSCRIBE, left_client.clone(), "")]);
    let recipients: Vec<ClientId> = subscribers.iter().cloned().collect();
    broadcast(push, hooks, subscribers, domain, &recipients, &payload);
}

/// For each recipient, enqueue `payload` via Push Core. A recipient that has
/// disappeared (`UnknownClient`) is dropped from `subscribers` and the
/// remaining subscribers are told via a synthetic `_unsubscribe`, which may
/// itself uncover further-lost recipients — hence the recursion.
fn broadcast(push: &PushCore, hooks: &dyn EventHooks, subscribers: &mut HashSet<ClientId>, domain: &str, recipients: &[ClientId], payload: &str) {
    let mut lost = Vec::new();
    for id in recipients {
        if push.queue(id, payload.to_string()).is_err() {
            lost.push(id.clone());
        }
    }
    for id in lost {
        if subscribers.remove(&id) {
            hooks.on_verbose(&format!("domain {domain}: dropping vanished subscriber {id}"));
            let notice = Message::encode_batch(&[Message::create(domain, Reserved::UNSUBSCRIBE, id.clone(), "")]);
            let remaining: Vec<ClientId> = subscribers.iter().cloned().collect();
            broadcast(push, hooks, subscribers, domain, &remaining, &notice);
        }
    }
}

/// Applies each message in order, accumulating everything that was
/// accepted, then broadcasts the accumulated batch once: to every
/// subscriber but the originator, or to everyone if the originator is the
/// server (`origin: None`).
fn apply_and_broadcast(
    store: &DomainStore,
    push: &PushCore,
    hooks: &dyn EventHooks,
    subscribers: &mut HashSet<ClientId>,
    domain: &str,
    origin: Option<ClientId>,
    batch: Vec<Message>,
) {
    let mut accepted = Vec::with_capacity(batch.len());
    for msg in batch {
        if apply_one(store, hooks, domain, &msg) {
            accepted.push(msg);
        }
    }
    if accepted.is_empty() {
        return;
    }
    let payload = Message::encode_batch(&accepted);
    let recipients: Vec<ClientId> = match &origin {
        Some(origin) => subscribers.iter().filter(|id| *id != origin).cloned().collect(),
        None => subscribers.iter().cloned().collect(),
    };
    broadcast(push, hooks, subscribers, domain, &recipients, &payload);
}

/// Validates and applies one message, returning whether it was accepted.
/// Malformed messages fire `on_error`, collisions fire `on_collision`; both
/// return `false` and the message is simply dropped from the batch.
fn apply_one(store: &DomainStore, hooks: &dyn EventHooks, domain: &str, msg: &Message) -> bool {
    if is_ephemeral(&msg.key) {
        return true;
    }

    match msg.command {
        Command::Create => {
            let (Some(value), Some(version)) = (&msg.value, &msg.version) else {
                hooks.on_error(&format!("create {domain}:{} missing value or version", msg.key));
                return false;
            };
            if store.contains(&msg.key) {
                hooks.on_collision(CollisionKind::Create, domain, &msg.key);
                return false;
            }
            if let Err(err) = store.insert(&msg.key, value, version) {
                hooks.on_error(&format!("create {domain}:{} failed to persist: {err}", msg.key));
                return false;
            }
            true
        }
        Command::Update => {
            let (Some(value), Some(version), Some(previous)) = (&msg.value, &msg.version, &msg.previous_version) else {
                hooks.on_error(&format!("update {domain}:{} missing value, version, or previous_version", msg.key));
                return false;
            };
            match store.get(&msg.key) {
                Some((_, existing_version)) if &existing_version == previous => {
                    if let Err(err) = store.insert(&msg.key, value, version) {
                        hooks.on_error(&format!("update {domain}:{} failed to persist: {err}", msg.key));
                        return false;
                    }
                    true
                }
                _ => {
                    hooks.on_collision(CollisionKind::Update, domain, &msg.key);
                    false
                }
            }
        }
        Command::Delete => {
            if !store.contains(&msg.key) {
                hooks.on_collision(CollisionKind::Delete, domain, &msg.key);
                return false;
            }
            if let Err(err) = store.remove(&msg.key) {
                hooks.on_error(&format!("delete {domain}:{} failed to persist: {err}", msg.key));
                return false;
            }
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::TracingHooks;
    use std::time::Duration;
    use tempfile::TempDir;

    fn hooks() -> Arc<dyn EventHooks> {
        Arc::new(TracingHooks)
    }

    fn push() -> Arc<PushCore> {
        Arc::new(PushCore::new(Duration::from_secs(60), Duration::from_millis(200), hooks()))
    }

    #[test]
    fn ephemeral_keys_bypass_the_store_and_collision_check() {
        let dir = TempDir::new().unwrap();
        let store = DomainStore::open(dir.path()).unwrap();
        let h = hooks();
        let msg = Message::create("d1", "%cursor", "v1", "ver1");

        assert!(apply_one(&store, &*h, "d1", &msg));
        assert!(!store.contains("%cursor"), "ephemeral keys must never be persisted");
        // a repeat create of the same ephemeral key is not a collision: ephemeral keys
        // are never collision-checked, only ever broadcast.
        assert!(apply_one(&store, &*h, "d1", &msg));
    }

    #[tokio::test]
    async fn subscribe_and_unsubscribe_notices_reach_the_other_subscriber() {
        let dir = TempDir::new().unwrap();
        let push = push();
        push.connect("a".into());
        push.connect("b".into());
        let handle = spawn("d1".to_string(), dir.path().to_path_buf(), push.clone(), hooks());

        handle.sender.send(MetaMessage::Subscribe("a".into())).unwrap();
        push.receive(&"a".into()).await.unwrap(); // a's own replay

        handle.sender.send(MetaMessage::Subscribe("b".into())).unwrap();
        push.receive(&"b".into()).await.unwrap(); // b's own replay

        let notice = push.receive(&"a".into()).await.unwrap().unwrap();
        assert!(notice.contains("_subscribe"));
        assert!(notice.contains("\"b\""));

        handle.sender.send(MetaMessage::Unsubscribe("b".into())).unwrap();
        let notice = push.receive(&"a".into()).await.unwrap().unwrap();
        assert!(notice.contains("_unsubscribe"));
        assert!(notice.contains("\"b\""));
    }

    /// Scenario 6 of the testable properties: the domain worker detects a
    /// subscriber whose Push record has disappeared, prunes it, and
    /// recursively renotifies the survivors with a synthetic `_unsubscribe`.
    #[tokio::test]
    async fn a_dead_recipient_is_pruned_and_survivors_are_renotified() {
        let dir = TempDir::new().unwrap();
        let push = push();
        push.connect("a".into());
        push.connect("b".into());
        let handle = spawn("d1".to_string(), dir.path().to_path_buf(), push.clone(), hooks());

        handle.sender.send(MetaMessage::Subscribe("a".into())).unwrap();
        push.receive(&"a".into()).await.unwrap();
        handle.sender.send(MetaMessage::Subscribe("b".into())).unwrap();
        push.receive(&"b".into()).await.unwrap();
        push.receive(&"a".into()).await.unwrap(); // a's _subscribe notice about b

        // b's Push record is destroyed without going through the domain's own
        // unsubscribe path, simulating a client that vanished mid-session.
        push.disconnect(&"b".into());

        handle
            .sender
            .send(MetaMessage::Messages {
                origin: None,
                batch: vec![Message::create("d1", "k1", "v1", "ver1")],
            })
            .unwrap();

        let published = push.receive(&"a".into()).await.unwrap().unwrap();
        assert!(published.contains("\"k1\""));

        let pruned_notice = push.receive(&"a".into()).await.unwrap().unwrap();
        assert!(pruned_notice.contains("_unsubscribe"));
        assert!(pruned_notice.contains("\"b\""));
    }
}
