//! Helpers for the handful of key names the protocol treats specially.

/// Server-originated metadata keys broadcast during subscribe/unsubscribe.
///
/// Clients should treat all of these as ephemeral metadata, not as entries
/// in the domain's persistent map.
pub struct Reserved;

impl Reserved {
    pub const CLIENTS: &'static str = "_clients";
    pub const SYNCED: &'static str = "_synced";
    pub const SUBSCRIBE: &'static str = "_subscribe";
    pub const UNSUBSCRIBE: &'static str = "_unsubscribe";
}

/// A key whose first character is `%` is ephemeral: broadcast but never
/// persisted, and never collision-checked.
pub fn is_ephemeral(key: &str) -> bool {
    key.starts_with('%')
}

/// A key under the reserved `_` prefix is server-originated metadata.
pub fn is_reserved(key: &str) -> bool {
    key.starts_with('_')
}
