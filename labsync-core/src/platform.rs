//! Platform-specific paths

use std::path::PathBuf;

/// Per-user data directory (`dirs::data_local_dir`), falling back to the
/// working directory on platforms without one.
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("labsync")
}

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("labsync")
}

pub fn default_store_path() -> PathBuf {
    get_data_dir().join("local_store.db")
}

pub fn default_config_path() -> PathBuf {
    get_config_dir().join("labsync.toml")
}

/// Session-scoped marker. Lives under the runtime dir where the platform has
/// one, so it does not outlive the login session.
pub fn default_session_marker_path() -> PathBuf {
    dirs::runtime_dir()
        .map(|d| d.join("labsync"))
        .unwrap_or_else(|| std::env::temp_dir().join("labsync"))
        .join("migrated")
}
