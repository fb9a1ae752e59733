//! User-triggered upload of local state to the backend.

use crate::remote::StorageClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Delay before the application re-reads state after a successful sync.
pub const DEFAULT_RELOAD_DELAY: Duration = Duration::from_millis(1500);

/// Outcome of one sync attempt. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub sync_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResult {
    fn failed(error: String) -> Self {
        Self {
            success: false,
            sync_count: 0,
            failed_keys: Vec::new(),
            error: Some(error),
        }
    }
}

/// Receives the "re-read state from the backend" request after a successful sync.
pub trait ReloadHook: Send + Sync {
    fn schedule_reload(&self, delay: Duration);
}

/// Hook that ignores reload requests.
pub struct NoReload;

impl ReloadHook for NoReload {
    fn schedule_reload(&self, _delay: Duration) {}
}

/// Pushes every local entry to the backend on demand.
///
/// The trigger never cleans the local store; after a failed or partial sync
/// the local copy is intact and the sync can simply be run again.
pub struct SyncTrigger {
    client: StorageClient,
    reload: Arc<dyn ReloadHook>,
    reload_delay: Duration,
}

impl SyncTrigger {
    pub fn new(client: StorageClient) -> Self {
        Self {
            client,
            reload: Arc::new(NoReload),
            reload_delay: DEFAULT_RELOAD_DELAY,
        }
    }

    pub fn with_reload(mut self, reload: Arc<dyn ReloadHook>, delay: Duration) -> Self {
        self.reload = reload;
        self.reload_delay = delay;
        self
    }

    /// Upload every local entry, credentials included.
    ///
    /// Succeeds only if every entry was accepted; a partial upload is a
    /// failure and does not schedule a reload.
    pub async fn run(&self) -> SyncResult {
        let entries = match self.client.local().entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Sync aborted, cannot read local store: {}", e);
                return SyncResult::failed(e.to_string());
            }
        };

        let attempted = entries.len();
        let mut sync_count = 0usize;
        let mut failed_keys = Vec::new();
        let mut last_error = None;

        for entry in entries {
            match self.client.write_raw(&entry.key, &entry.value).await {
                Ok(()) => sync_count += 1,
                Err(e) => {
                    last_error = Some(e.to_string());
                    failed_keys.push(entry.key);
                }
            }
        }

        if failed_keys.is_empty() {
            info!("Sync complete: {} entries uploaded", sync_count);
            self.reload.schedule_reload(self.reload_delay);
            return SyncResult {
                success: true,
                sync_count,
                failed_keys,
                error: None,
            };
        }

        warn!(
            "Sync incomplete: {} of {} entries uploaded, {} failed",
            sync_count,
            attempted,
            failed_keys.len()
        );
        SyncResult {
            success: false,
            sync_count,
            error: Some(format!(
                "{} of {} entries failed to upload: {}",
                failed_keys.len(),
                attempted,
                last_error.unwrap_or_default()
            )),
            failed_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeRemote;
    use crate::store::LocalStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingReload {
        requests: Mutex<Vec<Duration>>,
    }

    impl ReloadHook for RecordingReload {
        fn schedule_reload(&self, delay: Duration) {
            self.requests.lock().unwrap().push(delay);
        }
    }

    fn setup() -> (Arc<FakeRemote>, LocalStore, Arc<RecordingReload>, SyncTrigger) {
        let remote = Arc::new(FakeRemote::new());
        let local = LocalStore::in_memory();
        let reload = Arc::new(RecordingReload::default());
        let trigger = SyncTrigger::new(StorageClient::new(remote.clone(), local.clone()))
            .with_reload(reload.clone(), Duration::from_millis(1500));
        (remote, local, reload, trigger)
    }

    #[tokio::test]
    async fn uploads_every_entry_and_schedules_reload() {
        let (remote, local, reload, trigger) = setup();
        local.set("essais:filtres", r#"{"statut":"en_cours"}"#).unwrap();
        local.set("menu:ouvert", "true").unwrap();
        local.set("rapports:brouillon", "texte libre").unwrap();

        let result = trigger.run().await;
        assert!(result.success);
        assert_eq!(result.sync_count, 3);
        assert!(result.error.is_none());
        assert_eq!(
            remote.value("essais:filtres").as_deref(),
            Some(r#"{"statut":"en_cours"}"#)
        );
        assert_eq!(remote.value("rapports:brouillon").as_deref(), Some("texte libre"));
        assert_eq!(*reload.requests.lock().unwrap(), vec![Duration::from_millis(1500)]);
    }

    #[tokio::test]
    async fn logged_in_store_counts_every_entry() {
        let (remote, local, _reload, trigger) = setup();
        local.set("access_token", "eyJ.access").unwrap();
        local.set("user", r#"{"id":1}"#).unwrap();
        local.set("menu:ouvert", "false").unwrap();

        let result = trigger.run().await;
        assert!(result.success);
        assert_eq!(result.sync_count, 3);
        assert_eq!(remote.value("access_token").as_deref(), Some("eyJ.access"));
        assert_eq!(remote.len(), 3);
        // Uploading never touches the local copy.
        assert_eq!(local.len().unwrap(), 3);
    }

    #[tokio::test]
    async fn partial_failure_reports_failure_without_reload() {
        let (remote, local, reload, trigger) = setup();
        local.set("a", "1").unwrap();
        local.set("b", "2").unwrap();
        local.set("c", "3").unwrap();
        remote.reject("b");

        let result = trigger.run().await;
        assert!(!result.success);
        assert_eq!(result.sync_count, 2);
        assert_eq!(result.failed_keys, vec!["b"]);
        assert!(result.error.as_deref().unwrap().starts_with("1 of 3 entries failed"));
        assert!(reload.requests.lock().unwrap().is_empty());
        // Local state is untouched so the sync can be retried.
        assert_eq!(local.len().unwrap(), 3);
    }

    #[tokio::test]
    async fn offline_backend_fails_every_entry() {
        let (remote, local, reload, trigger) = setup();
        local.set("a", "1").unwrap();
        remote.set_offline(true);

        let result = trigger.run().await;
        assert!(!result.success);
        assert_eq!(result.sync_count, 0);
        assert!(reload.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn retry_after_failure_succeeds() {
        let (remote, local, reload, trigger) = setup();
        local.set("a", "1").unwrap();
        remote.set_offline(true);
        assert!(!trigger.run().await.success);

        remote.set_offline(false);
        let result = trigger.run().await;
        assert!(result.success);
        assert_eq!(result.sync_count, 1);
        assert_eq!(reload.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_store_is_a_successful_noop() {
        let (_remote, _local, _reload, trigger) = setup();
        let result = trigger.run().await;
        assert!(result.success);
        assert_eq!(result.sync_count, 0);
    }

    #[test]
    fn result_serializes_in_camel_case() {
        let result = SyncResult {
            success: true,
            sync_count: 4,
            failed_keys: Vec::new(),
            error: None,
        };
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"success":true,"syncCount":4}"#
        );
    }
}
