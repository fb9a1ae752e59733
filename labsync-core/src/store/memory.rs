//! In-memory store, used for tests and dev mode.

use super::{check_quota, entry_size, KeyValueStore, StoreError};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses writes once `quota_bytes` would be exceeded.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn usage_excluding(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| entry_size(k, v))
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_quota(self.quota_bytes, self.usage_excluding(key), key, value)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_previous_value() {
        let mut store = MemoryStore::new();
        store.set("user", "alice").unwrap();
        store.set("user", "bob").unwrap();
        assert_eq!(store.get("user").unwrap().as_deref(), Some("bob"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn remove_missing_key_is_ok() {
        let mut store = MemoryStore::new();
        assert!(store.remove("nope").is_ok());
        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn quota_exhaustion_propagates_and_leaves_store_unchanged() {
        let mut store = MemoryStore::with_quota(16);
        store.set("a", "0123456789").unwrap(); // 11 bytes

        let err = store.set("b", "0123456789").unwrap_err();
        assert_eq!(
            err,
            StoreError::QuotaExceeded {
                needed: 22,
                limit: 16
            }
        );
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn overwrite_does_not_double_count_existing_entry() {
        let mut store = MemoryStore::with_quota(12);
        store.set("a", "0123456789").unwrap();
        assert!(store.set("a", "9876543210").is_ok());
    }

    #[test]
    fn clear_empties_store() {
        let mut store = MemoryStore::new();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.clear().unwrap();
        assert!(store.keys().unwrap().is_empty());
    }
}
