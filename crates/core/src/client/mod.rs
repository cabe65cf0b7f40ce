//! Client Registry (component A): owns per-client queues, locks, and
//! heartbeat watchdogs. [`crate::push`] builds the blocking long-poll
//! operations on top of this.

pub(crate) mod record;
mod registry;

pub use record::ClientRecord;
pub use registry::ClientRegistry;

pub use realtime_client_api_messages::ClientId;
