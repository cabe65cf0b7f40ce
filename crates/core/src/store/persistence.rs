//! The durable ordered map backing one domain's store.
//!
//! A `sled::Tree` gives us the "durable ordered map with transactional batch
//! semantics" the spec asks for: single-key reads/writes are already
//! atomic, and `iter()` over a tree yields a consistent point-in-time view,
//! which is all the replay path (a read-only batch) needs.

use sled::Db;
use std::path::Path;

/// `(value, version)` as stored for one non-ephemeral key.
pub(crate) type StoredValue = (String, String);

pub(crate) struct DomainStore {
    db: Db,
}

impl DomainStore {
    pub(crate) fn open(path: impl AsRef<Path>) -> sled::Result<Self> {
        let db = sled::Config::default().path(path).flush_every_ms(Some(50)).open()?;
        Ok(Self { db })
    }

    pub(crate) fn get(&self, key: &str) -> Option<StoredValue> {
        let bytes = self.db.get(key.as_bytes()).ok().flatten()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.db.contains_key(key.as_bytes()).unwrap_or(false)
    }

    pub(crate) fn insert(&self, key: &str, value: &str, version: &str) -> sled::Result<()> {
        let encoded = serde_json::to_vec(&(value, version)).expect("(String, String) always serializes");
        self.db.insert(key.as_bytes(), encoded)?;
        Ok(())
    }

    pub(crate) fn remove(&self, key: &str) -> sled::Result<()> {
        self.db.remove(key.as_bytes())?;
        Ok(())
    }

    /// Every persistent key currently in the domain, for replay.
    pub(crate) fn iter_all(&self) -> Vec<(String, StoredValue)> {
        self.db
            .iter()
            .filter_map(|entry| entry.ok())
            .filter_map(|(key, value)| {
                let key = String::from_utf8(key.to_vec()).ok()?;
                let stored: StoredValue = serde_json::from_slice(&value).ok()?;
                Some((key, stored))
            })
            .collect()
    }

    pub(crate) fn flush(&self) {
        let _ = self.db.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_create_update_delete() {
        let dir = TempDir::new().unwrap();
        let store = DomainStore::open(dir.path()).unwrap();
        assert!(!store.contains("k1"));
        store.insert("k1", "v1", "ver1").unwrap();
        assert_eq!(store.get("k1"), Some(("v1".to_string(), "ver1".to_string())));
        store.insert("k1", "v2", "ver2").unwrap();
        assert_eq!(store.get("k1"), Some(("v2".to_string(), "ver2".to_string())));
        store.remove("k1").unwrap();
        assert!(!store.contains("k1"));
    }

    #[test]
    fn iter_all_reflects_every_persisted_key() {
        let dir = TempDir::new().unwrap();
        let store = DomainStore::open(dir.path()).unwrap();
        store.insert("k1", "v1", "ver1").unwrap();
        store.insert("k2", "v2", "ver2").unwrap();
        let mut all = store.iter_all();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            all,
            vec![
                ("k1".to_string(), ("v1".to_string(), "ver1".to_string())),
                ("k2".to_string(), ("v2".to_string(), "ver2".to_string())),
            ]
        );
    }
}
