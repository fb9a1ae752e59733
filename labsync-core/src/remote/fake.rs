//! In-memory [`RemoteStore`] for unit tests.

use crate::remote::{RemoteError, RemoteStore};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeRemote {
    values: Mutex<BTreeMap<String, String>>,
    rejected: Mutex<HashSet<String>>,
    offline: AtomicBool,
    fetches: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }

    /// Every call fails with a transport error while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Writes to `key` fail with a 400.
    pub fn reject(&self, key: &str) {
        self.rejected.lock().unwrap().insert(key.to_string());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn put(&self, key: &str, payload: &str) -> Result<(), RemoteError> {
        self.check_online()?;
        if self.rejected.lock().unwrap().contains(key) {
            return Err(RemoteError::Status {
                status: 400,
                body: "rejected".to_string(),
            });
        }
        self.insert(key, payload);
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.value(key))
    }

    async fn delete(&self, key: &str) -> Result<(), RemoteError> {
        self.check_online()?;
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, RemoteError> {
        self.check_online()?;
        Ok(self.values.lock().unwrap().keys().cloned().collect())
    }
}
