//! Lab client storage migration core
//!
//! This library moves the lab reporting client's key/value state from the
//! local store to the backend storage resource: the local store adapter,
//! the remote storage client with its read fallback, the session-gated
//! cleanup routine, the sync trigger, and the inspection/export tools.

pub mod capacity;
pub mod config;
pub mod inspect;
pub mod migration;
pub mod platform;
pub mod remote;
pub mod resolve;
pub mod store;
pub mod sync;

pub use capacity::{CapacityClient, CapacityStatus};
pub use config::LabSyncConfig;
pub use inspect::{export_all, export_file_name, import_document, inspect, write_export, EntrySummary};
pub use migration::{AllowList, Cleanup, CleanupOutcome, CleanupReport, MigrationMarker, MigrationState};
pub use remote::{ApiClient, HttpRemoteStore, RemoteError, RemoteStore, StorageClient};
pub use resolve::{ReadPolicy, Resolved, ValueSource};
pub use store::{KeyValueStore, LocalStore, MemoryStore, SqliteStore, StorageEntry, StoreError};
pub use sync::{NoReload, ReloadHook, SyncResult, SyncTrigger};

use thiserror::Error;

/// Result type for labsync operations
pub type Result<T> = std::result::Result<T, LabSyncError>;

/// General error type for labsync operations
#[derive(Error, Debug)]
pub enum LabSyncError {
    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Remote error: {0}")]
    Remote(#[from] remote::RemoteError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
