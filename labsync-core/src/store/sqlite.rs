//! SQLite-backed local store.

use super::{check_quota, KeyValueStore, StoreError};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

/// Persistent local store kept in a single SQLite table.
pub struct SqliteStore {
    conn: Connection,
    quota_bytes: Option<usize>,
}

impl SqliteStore {
    /// Open (or create) a store at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;

        let store = Self {
            conn,
            quota_bytes: None,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create a new in-memory store for testing
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            quota_bytes: None,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn usage_excluding(&self, key: &str) -> Result<usize, StoreError> {
        let used: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
             FROM kv_entries WHERE key != ?1",
            [key],
            |row| row.get(0),
        )?;
        Ok(used as usize)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.quota_bytes.is_some() {
            check_quota(self.quota_bytes, self.usage_excluding(key)?, key, value)?;
        }
        self.conn.execute(
            "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1", [key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_entries ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM kv_entries", [])?;
        Ok(())
    }

    fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM kv_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
