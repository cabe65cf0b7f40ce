//! Wire schema shared by the push channel and the replicated store.
//!
//! Nothing in this crate ever blocks or touches a lock; it exists purely to
//! give both the core engine and the HTTP adapter a single definition of
//! what crosses the wire.

pub mod message;
pub mod reserved;

pub use message::{Command, Message, MessageParseError};
pub use reserved::{is_ephemeral, is_reserved, Reserved};

/// An opaque, server-unvalidated client identifier.
///
/// The source generates these client-side from `[A-Za-z0-9]`; the server
/// never inspects the contents beyond using it as a map key.
pub type ClientId = String;

/// A domain name, already known to satisfy [`reserved::DOMAIN_NAME_RE`].
pub type DomainName = String;
