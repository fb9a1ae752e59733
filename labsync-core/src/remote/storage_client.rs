//! Caller-facing storage client: remote writes, reads with local fallback.

use crate::remote::{RemoteError, RemoteStore};
use crate::resolve::{ReadPolicy, Resolved, ValueSource};
use crate::store::LocalStore;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage client over the backend resource, backed by the local store.
///
/// Writes go to the backend only and report failure to the caller. Reads,
/// deletes and listings never fail: they degrade to the local copy, a logged
/// warning, or an empty listing.
#[derive(Clone)]
pub struct StorageClient {
    remote: Arc<dyn RemoteStore>,
    local: LocalStore,
    policy: ReadPolicy,
}

impl StorageClient {
    pub fn new(remote: Arc<dyn RemoteStore>, local: LocalStore) -> Self {
        Self {
            remote,
            local,
            policy: ReadPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ReadPolicy {
        self.policy
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// Serialize `value` and store it remotely under `key`.
    ///
    /// An existing remote value is overwritten (last write wins). There is no
    /// local fallback: the caller decides what a failed write means.
    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), RemoteError> {
        let payload = serde_json::to_string(value)
            .map_err(|e| RemoteError::InvalidRequest(format!("Cannot serialize {}: {}", key, e)))?;
        self.write_raw(key, &payload).await
    }

    /// Store an already-serialized payload remotely, unchanged.
    pub async fn write_raw(&self, key: &str, payload: &str) -> Result<(), RemoteError> {
        self.remote.put(key, payload).await.map_err(|e| {
            warn!("Remote write failed for {}: {}", key, e);
            e
        })
    }

    /// Read `key`, deserialized. `None` when no tier has a value.
    pub async fn read(&self, key: &str) -> Option<Value> {
        self.read_resolved(key).await.map(|r| r.value)
    }

    /// Read `key` and report which tier answered.
    pub async fn read_resolved(&self, key: &str) -> Option<Resolved> {
        for &source in self.policy.tiers() {
            let payload = match source {
                ValueSource::Remote => self.fetch_remote(key).await,
                ValueSource::Local => self.fetch_local(key),
            };
            if let Some(payload) = payload {
                debug!("Read {} from {:?} store", key, source);
                return Some(Resolved::from_payload(&payload, source));
            }
        }
        None
    }

    async fn fetch_remote(&self, key: &str) -> Option<String> {
        match self.remote.fetch(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Remote read failed for {}, trying local copy: {}", key, e);
                None
            }
        }
    }

    fn fetch_local(&self, key: &str) -> Option<String> {
        match self.local.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Local read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Best-effort remote delete; failures are logged only.
    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.remote.delete(key).await {
            warn!("Remote delete failed for {}: {}", key, e);
        }
    }

    /// Keys known to the backend, or an empty list when it cannot be reached.
    pub async fn list_keys(&self) -> Vec<String> {
        self.remote.list_keys().await.unwrap_or_else(|e| {
            warn!("Remote listing failed: {}", e);
            Vec::new()
        })
    }
}
