//! One-shot local store cleanup once the backend has become authoritative.
//!
//! Cleanup keeps the authentication artifacts and drops everything else. It
//! runs at most once per session; the session flag is a [`MigrationMarker`]
//! handed in by the caller rather than ambient global state.

use crate::store::{LocalStore, StoreError};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Keys that hold authentication state and must survive cleanup.
pub const DEFAULT_ALLOW_LIST: [&str; 3] = ["access_token", "refresh_token", "user"];

/// Fixed set of keys exempt from purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowList {
    keys: Vec<String>,
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOW_LIST)
    }
}

impl AllowList {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        keys.sort();
        keys.dedup();
        Self { keys }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// Migration state of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Pending,
    Completed,
}

#[derive(Debug)]
enum MarkerBacking {
    Memory(AtomicBool),
    /// Flag persisted as the existence of a file, for sessions that span
    /// several processes (the CLI).
    File(PathBuf),
}

/// "Cleanup already performed this session" flag.
///
/// Unset when a session begins; cleared again by [`MigrationMarker::end_session`].
#[derive(Debug)]
pub struct MigrationMarker {
    backing: MarkerBacking,
}

impl Default for MigrationMarker {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl MigrationMarker {
    pub fn in_memory() -> Self {
        Self {
            backing: MarkerBacking::Memory(AtomicBool::new(false)),
        }
    }

    /// Marker persisted at `path`. An existing file means the session has
    /// already been cleaned.
    pub fn at_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            backing: MarkerBacking::File(path.as_ref().to_path_buf()),
        }
    }

    pub fn is_set(&self) -> bool {
        match &self.backing {
            MarkerBacking::Memory(flag) => flag.load(Ordering::SeqCst),
            MarkerBacking::File(path) => path.exists(),
        }
    }

    pub fn state(&self) -> MigrationState {
        if self.is_set() {
            MigrationState::Completed
        } else {
            MigrationState::Pending
        }
    }

    fn set(&self) -> Result<()> {
        match &self.backing {
            MarkerBacking::Memory(flag) => flag.store(true, Ordering::SeqCst),
            MarkerBacking::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, chrono::Utc::now().to_rfc3339())?;
            }
        }
        Ok(())
    }

    /// Close the session: the next cleanup request runs again.
    pub fn end_session(&self) -> Result<()> {
        match &self.backing {
            MarkerBacking::Memory(flag) => flag.store(false, Ordering::SeqCst),
            MarkerBacking::File(path) => match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }
}

/// Status trace of one purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub before: usize,
    pub after: usize,
    pub preserved: Vec<String>,
}

impl CleanupReport {
    pub fn removed(&self) -> usize {
        self.before.saturating_sub(self.after)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Completed(CleanupReport),
    /// The marker was already set for this session; nothing was touched.
    Skipped,
}

/// Purges the local store down to the allow-list.
#[derive(Debug, Clone, Default)]
pub struct Cleanup {
    allow_list: AllowList,
}

impl Cleanup {
    pub fn new(allow_list: AllowList) -> Self {
        Self { allow_list }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Clear the store, keeping only allow-listed keys that had a value.
    ///
    /// Running this twice leaves the same key set as running it once.
    pub fn purge(&self, store: &LocalStore) -> std::result::Result<CleanupReport, StoreError> {
        let before = store.len()?;

        let mut kept = Vec::new();
        for key in self.allow_list.keys() {
            if let Some(value) = store.get(key)? {
                kept.push((key.clone(), value));
            }
        }

        store.clear()?;
        for (key, value) in &kept {
            store.set(key, value)?;
        }

        let report = CleanupReport {
            before,
            after: store.len()?,
            preserved: kept.into_iter().map(|(key, _)| key).collect(),
        };
        info!(
            "Local store cleanup: {} entries before, {} after (kept: {})",
            report.before,
            report.after,
            report.preserved.join(", ")
        );
        Ok(report)
    }

    /// Purge unless this session has already been cleaned.
    ///
    /// The marker is only set after a successful purge, so a failed run can
    /// be retried.
    pub fn run_once(&self, store: &LocalStore, marker: &MigrationMarker) -> Result<CleanupOutcome> {
        if marker.is_set() {
            info!("Local store cleanup already performed this session");
            return Ok(CleanupOutcome::Skipped);
        }

        let report = self.purge(store)?;
        marker.set()?;
        Ok(CleanupOutcome::Completed(report))
    }
}
