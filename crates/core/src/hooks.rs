//! Notification hooks.
//!
//! The reference implementation takes these as free-form configurable
//! procedures; here they become a capability trait so a caller can observe
//! connect/disconnect/subscribe traffic, ad-hoc diagnostics, and the two
//! non-fatal defect classes (malformed messages, collisions) without the
//! engine taking a dependency on any particular logging or metrics stack.
//!
//! Hooks are always invoked outside of any lock the engine holds, so a hook
//! may safely call back into [`crate::PushCore`] or [`crate::StoreCore`].

use crate::client::ClientId;
use crate::error::CollisionKind;
use std::sync::Arc;

pub trait EventHooks: Send + Sync {
    fn on_connect(&self, _id: &ClientId) {}
    fn on_disconnect(&self, _id: &ClientId) {}
    fn on_subscribe(&self, _id: &ClientId, _domain: &str) {}
    fn on_verbose(&self, _message: &str) {}
    fn on_error(&self, _message: &str) {}
    fn on_collision(&self, _kind: CollisionKind, _domain: &str, _key: &str) {}
}

/// The default hook set: silence on the happy path, `tracing` on everything
/// else, matching the reference implementation's "no-op / stderr" default.
#[derive(Debug, Default)]
pub struct TracingHooks;

impl EventHooks for TracingHooks {
    fn on_connect(&self, id: &ClientId) {
        tracing::debug!(client_id = %id, "client connected");
    }

    fn on_disconnect(&self, id: &ClientId) {
        tracing::debug!(client_id = %id, "client disconnected");
    }

    fn on_subscribe(&self, id: &ClientId, domain: &str) {
        tracing::debug!(client_id = %id, domain, "client subscribed");
    }

    fn on_verbose(&self, message: &str) {
        tracing::trace!("{message}");
    }

    fn on_error(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn on_collision(&self, kind: CollisionKind, domain: &str, key: &str) {
        tracing::warn!(%kind, domain, key, "collision rejected");
    }
}

pub fn default_hooks() -> Arc<dyn EventHooks> {
    Arc::new(TracingHooks)
}
