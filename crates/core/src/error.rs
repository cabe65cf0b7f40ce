use crate::client::ClientId;
use thiserror::Error;

/// The error taxonomy for the public surface of [`crate::PushCore`] and
/// [`crate::StoreCore`].
///
/// Collisions and per-message malformed-message defects are *not* part of
/// this enum: they never fail a request, they are reported through
/// [`crate::hooks::EventHooks`] and the offending message is skipped. See
/// [`Collision`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// A Push operation referenced a client id that isn't (or is no longer)
    /// registered. Maps to HTTP 501 at the adapter.
    #[error("unknown client: {0}")]
    UnknownClient(ClientId),

    /// A domain name failed `[A-Za-z0-9_.]+` validation, or was exactly `_`.
    #[error("invalid domain name: {0:?}")]
    BadDomain(String),

    /// A `messages` request body was not JSON or not a JSON array. This is
    /// the only batch-level parse failure; individual malformed elements of
    /// an otherwise-valid array are reported via `on_error` and skipped
    /// instead.
    #[error("malformed request body: {0}")]
    MalformedMessage(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Optimistic-concurrency rejection of one message within an otherwise
/// well-formed batch. Non-fatal: reported via `on_collision`, the message is
/// dropped, and the rest of the batch proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    Create,
    Update,
    Delete,
}

impl CollisionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CollisionKind::Create => "create",
            CollisionKind::Update => "update",
            CollisionKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for CollisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
