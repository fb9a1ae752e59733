//! Client configuration.

use crate::migration::{AllowList, DEFAULT_ALLOW_LIST};
use crate::platform::{default_session_marker_path, default_store_path};
use crate::resolve::ReadPolicy;
use crate::{LabSyncError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabSyncConfig {
    pub api_base_url: String,
    pub store_path: PathBuf,
    pub session_marker_path: PathBuf,
    pub export_dir: PathBuf,
    pub allow_list: Vec<String>,
    pub access_token_key: String,
    pub read_policy: ReadPolicy,
    pub reload_delay_ms: u64,
    pub request_timeout_secs: Option<u64>,
    pub quota_bytes: Option<usize>,
}

impl Default for LabSyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".to_string(),
            store_path: default_store_path(),
            session_marker_path: default_session_marker_path(),
            export_dir: PathBuf::from("."),
            allow_list: DEFAULT_ALLOW_LIST.iter().map(|k| k.to_string()).collect(),
            access_token_key: "access_token".to_string(),
            read_policy: ReadPolicy::RemoteThenLocal,
            reload_delay_ms: 1500,
            request_timeout_secs: None,
            quota_bytes: None,
        }
    }
}

impl LabSyncConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LabSyncError::Config(e.to_string()))
    }

    pub fn allow_list(&self) -> AllowList {
        AllowList::new(self.allow_list.iter().cloned())
    }

    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }

    /// `None` leaves the transport default in place.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
