//! Store Core (component D): owns the mapping from domain name to Domain
//! Worker, dispatches inbound batches, exposes server-origin mutators, and
//! runs the periodic client-liveness sweep.

mod domain;
mod persistence;

use crate::client::ClientId;
use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::hooks::EventHooks;
use crate::push::PushCore;
use domain::{DomainHandle, MetaMessage};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use realtime_client_api_messages::{DomainName, Message};
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

static DOMAIN_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.]+$").unwrap());

fn validate_domain_name(name: &str) -> Result<()> {
    if name == "_" || !DOMAIN_NAME_RE.is_match(name) {
        return Err(CoreError::BadDomain(name.to_string()));
    }
    Ok(())
}

pub struct StoreCore {
    domains: RwLock<HashMap<DomainName, DomainHandle>>,
    push: Arc<PushCore>,
    db_path: PathBuf,
    hooks: Arc<dyn EventHooks>,
    sweep_handle: Mutex<Option<AbortHandle>>,
}

impl StoreCore {
    pub fn new(push: Arc<PushCore>, config: &Config) -> Arc<Self> {
        let this = Arc::new(Self {
            domains: RwLock::new(HashMap::new()),
            push,
            db_path: config.db_path.clone(),
            hooks: config.hooks.clone(),
            sweep_handle: Mutex::new(None),
        });

        let weak = Arc::downgrade(&this);
        let period = config.check_period;
        let sweep = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                let Some(store) = weak.upgrade() else { break };
                store.check_clients_all();
            }
        });
        *this.sweep_handle.lock() = Some(sweep.abort_handle());

        this
    }

    /// Parses `json` as a batch, reports per-element malformed messages via
    /// `on_error` without failing the request, partitions the valid
    /// remainder by domain, and enqueues one `messages` meta-message per
    /// partition.
    pub fn messages(&self, client_id: ClientId, json: &str) -> Result<()> {
        let parsed = Message::parse_batch(json).map_err(|e| CoreError::MalformedMessage(e.to_string()))?;

        let mut by_domain: HashMap<String, Vec<Message>> = HashMap::new();
        for result in parsed {
            match result {
                Ok(msg) => by_domain.entry(msg.domain.clone()).or_default().push(msg),
                Err(err) => self.hooks.on_error(&err.to_string()),
            }
        }

        for (domain, batch) in by_domain {
            let meta = MetaMessage::Messages {
                origin: Some(client_id.clone()),
                batch,
            };
            if let Err(err) = self.dispatch(&domain, meta) {
                self.hooks.on_error(&format!("dropping batch for domain {domain:?}: {err}"));
            }
        }

        Ok(())
    }

    pub fn subscribe(&self, client_id: ClientId, domain: &str) -> Result<()> {
        self.dispatch(domain, MetaMessage::Subscribe(client_id))
    }

    /// Unsubscribes `client_id` from every domain with an active worker.
    /// Domains the client never subscribed to simply ignore the
    /// unsubscribe (see the `Unsubscribe` handler in the domain worker).
    pub fn disconnected(&self, client_id: &ClientId) {
        let domains: Vec<String> = self.domains.read().keys().cloned().collect();
        for domain in domains {
            let _ = self.dispatch(&domain, MetaMessage::Unsubscribe(client_id.clone()));
        }
    }

    pub fn create(&self, domain: &str, key: &str, value: &str, version: &str) -> Result<()> {
        self.server_batch(domain, vec![Message::create(domain, key, value, version)])
    }

    pub fn update(&self, domain: &str, key: &str, value: &str, version: &str, previous_version: &str) -> Result<()> {
        self.server_batch(domain, vec![Message::update(domain, key, value, version, previous_version)])
    }

    pub fn delete(&self, domain: &str, key: &str) -> Result<()> {
        self.server_batch(domain, vec![Message::delete(domain, key)])
    }

    fn server_batch(&self, domain: &str, batch: Vec<Message>) -> Result<()> {
        self.dispatch(domain, MetaMessage::Messages { origin: None, batch })
    }

    /// Tells every worker to flush, close its store, and terminate, then
    /// waits for each to confirm. Cooperative: a worker mid-cycle finishes
    /// that cycle before acting on the shutdown.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.sweep_handle.lock().take() {
            handle.abort();
        }

        let handles: Vec<DomainHandle> = self.domains.read().values().cloned().collect();
        let mut acks = Vec::with_capacity(handles.len());
        for handle in handles {
            let (tx, rx) = oneshot::channel();
            if handle.sender.send(MetaMessage::Shutdown(tx)).is_ok() {
                acks.push(rx);
            }
        }
        for ack in acks {
            let _ = ack.await;
        }
    }

    fn check_clients_all(&self) {
        let domains: Vec<String> = self.domains.read().keys().cloned().collect();
        for domain in domains {
            let _ = self.dispatch(&domain, MetaMessage::CheckClients);
        }
    }

    /// Atomically creates-if-absent-or-dead, then enqueues. A domain whose
    /// worker has self-terminated (empty subscribers) still has a stale
    /// entry in the map until we notice its channel is closed here.
    fn dispatch(&self, domain: &str, meta: MetaMessage) -> Result<()> {
        validate_domain_name(domain)?;
        let mut meta = meta;
        loop {
            let handle = {
                let mut domains = self.domains.write();
                if !domains.contains_key(domain) {
                    let handle = domain::spawn(domain.to_string(), self.db_path.clone(), self.push.clone(), self.hooks.clone());
                    domains.insert(domain.to_string(), handle);
                }
                domains.get(domain).expect("just inserted if absent").clone()
            };
            match handle.sender.send(meta) {
                Ok(()) => return Ok(()),
                Err(returned) => {
                    self.domains.write().remove(domain);
                    meta = returned.0;
                }
            }
        }
    }
}

#[allow(dead_code)]
const _TEST_CHECK_PERIOD_FLOOR: Duration = Duration::from_millis(1);
