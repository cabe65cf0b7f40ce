//! Server-side substrate for real-time collaboration among browser clients.
//!
//! Two tightly-coupled subsystems live here:
//!
//! - [`push`]: a per-client long-poll channel ("Push").
//! - [`store`]: a replicated, domain-partitioned key-value store ("Store").
//!
//! They share only the [`client`] registry's presence query and the
//! [`hooks`] notification surface; everything else is internal to one side
//! or the other.

pub mod client;
pub mod config;
pub mod error;
pub mod hooks;
pub mod push;
pub mod store;

pub use config::Config;
pub use error::{CoreError, Result};
pub use push::PushCore;
pub use store::StoreCore;

pub use realtime_client_api_messages::{ClientId, Command, DomainName, Message};
