//! Remote storage: the backend key/value resource and the client facade
//! that falls back to the local store.

pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod http_store;
pub mod models;
pub mod storage_client;

pub use client::ApiClient;
pub use http_store::HttpRemoteStore;
pub use storage_client::StorageClient;

use async_trait::async_trait;
use thiserror::Error;

/// Failures talking to the backend.
///
/// Authorization failures are not distinguished from other non-success
/// statuses; no token refresh happens here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Raw operations against the backend storage resource.
///
/// Payloads are opaque strings; serialization is the caller's concern.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create or overwrite the remote value for `key`.
    async fn put(&self, key: &str, payload: &str) -> Result<(), RemoteError>;

    /// Fetch the remote value for `key`. `Ok(None)` when the backend has no entry.
    async fn fetch(&self, key: &str) -> Result<Option<String>, RemoteError>;

    async fn delete(&self, key: &str) -> Result<(), RemoteError>;

    async fn list_keys(&self) -> Result<Vec<String>, RemoteError>;
}
