//! Local key/value store adapter.
//!
//! The client keeps its state in a flat, string-keyed store. Everything above
//! this module talks to it through [`KeyValueStore`] so the same cleanup, sync
//! and export code runs against the SQLite file, an in-memory map in tests, or
//! anything else that can hold strings.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors raised by a local store.
///
/// Quota exhaustion is the only failure a healthy store produces; it is fatal
/// to the write that hit it and is never retried here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage quota exceeded: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Store lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

/// A single key/value pair as held by the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub key: String,
    pub value: String,
}

/// Synchronous string-keyed storage.
pub trait KeyValueStore: Send {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Snapshot of every key currently stored, in ascending order.
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Remove every entry.
    fn clear(&mut self) -> Result<(), StoreError>;

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.keys()?.len())
    }

    /// Snapshot of every entry, in key order.
    fn entries(&self) -> Result<Vec<StorageEntry>, StoreError> {
        let mut entries = Vec::new();
        for key in self.keys()? {
            // A key can vanish between listing and reading only if another
            // handle removed it; skip rather than report a phantom entry.
            if let Some(value) = self.get(&key)? {
                entries.push(StorageEntry { key, value });
            }
        }
        Ok(entries)
    }
}

/// Bytes an entry occupies against a quota (key plus value, as UTF-8).
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Reject a write that would push usage past `limit`.
///
/// `used_by_others` is the usage of every entry except the one being written.
pub(crate) fn check_quota(
    limit: Option<usize>,
    used_by_others: usize,
    key: &str,
    value: &str,
) -> Result<(), StoreError> {
    if let Some(limit) = limit {
        let needed = used_by_others + entry_size(key, value);
        if needed > limit {
            return Err(StoreError::QuotaExceeded { needed, limit });
        }
    }
    Ok(())
}

/// Cloneable handle to the client's local store.
///
/// Every component holds one of these instead of a concrete store type.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<Mutex<Box<dyn KeyValueStore>>>,
}

impl LocalStore {
    pub fn new<S: KeyValueStore + 'static>(store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(store))),
        }
    }

    /// Convenience constructor for an unbounded in-memory store.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn KeyValueStore>>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.lock()?.get(key)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?.set(key, value)
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key)
    }

    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.lock()?.keys()
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.lock()?.clear()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        self.lock()?.len()
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    pub fn entries(&self) -> Result<Vec<StorageEntry>, StoreError> {
        self.lock()?.entries()
    }
}
