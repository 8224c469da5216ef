//! Key-value persistence for PopAsk
//!
//! Everything PopAsk remembers between runs (usage counter, archived chats,
//! prompt templates, settings) is a JSON value under a string key. The
//! [`KeyValueStore`] trait is the port; [`SqliteStore`] and [`MemoryStore`]
//! are the two backends.
//!
//! Callers never fail because of persistence: [`load_json`] and
//! [`save_json`] log and swallow errors so the caller can fall back to
//! defaults.

use crate::config::StorageConfig;
use crate::error::{PopAskError, Result};
use anyhow::Context;
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

pub mod keys;
pub mod memory;

pub use memory::MemoryStore;

/// String-keyed persistence port
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Read and deserialize a JSON value, or `None` when missing or unreadable
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Discarding unreadable value for {}: {}", key, e);
            None
        }
    }
}

/// Serialize and store a JSON value, logging instead of failing
pub fn save_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Failed to serialize {}: {}", key, e);
            return;
        }
    };

    if let Err(e) = store.set(key, &raw) {
        tracing::warn!("Failed to persist {}: {}", key, e);
    }
}

/// SQLite-backed key-value store
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open the store described by the configuration
    ///
    /// Uses `storage.db_path` when set, otherwise `store.db` in the
    /// platform data directory.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        if let Some(path) = &config.db_path {
            return Self::new_with_path(path);
        }

        let proj_dirs = ProjectDirs::from("com", "popask", "popask")
            .ok_or_else(|| PopAskError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| PopAskError::Storage(e.to_string()))?;

        Self::new_with_path(data_dir.join("store.db"))
    }

    /// Open (or create) a store at an explicit path
    ///
    /// # Examples
    ///
    /// ```
    /// use popask::storage::{KeyValueStore, SqliteStore};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SqliteStore::new_with_path(dir.path().join("store.db")).unwrap();
    /// store.set("selectedPrompt", "\"Explain:\\n\"").unwrap();
    /// assert!(store.get("selectedPrompt").unwrap().is_some());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| PopAskError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    /// Path of the backing database file
    pub fn path(&self) -> &std::path::Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| PopAskError::Storage(e.to_string()).into())
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| PopAskError::Storage(e.to_string()))?;

        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.open()?;

        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .context("Failed to query key")
            .map_err(|e| PopAskError::Storage(e.to_string()))?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.open()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value, now],
        )
        .context("Failed to write key")
        .map_err(|e| PopAskError::Storage(e.to_string()))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.open()?;

        conn.execute("DELETE FROM kv WHERE key = ?", params![key])
            .context("Failed to delete key")
            .map_err(|e| PopAskError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    fn create_test_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let store = SqliteStore::new_with_path(dir.path().join("store.db"))
            .expect("failed to create store");
        (store, dir)
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    /// A store whose every operation fails
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(PopAskError::Storage("disk on fire".to_string()).into())
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(PopAskError::Storage("disk on fire".to_string()).into())
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Err(PopAskError::Storage("disk on fire".to_string()).into())
        }
    }

    #[test]
    fn test_sqlite_store_init_creates_table() {
        let (store, _dir) = create_test_store();
        let conn = Connection::open(store.path()).expect("open connection");
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='kv'",
                [],
                |r| r.get(0),
            )
            .expect("query row");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_sqlite_store_set_get_overwrite_remove() {
        let (store, _dir) = create_test_store();

        assert_eq!(store.get(keys::DAILY_USAGE_COUNT).unwrap(), None);

        store.set(keys::DAILY_USAGE_COUNT, "3").unwrap();
        assert_eq!(
            store.get(keys::DAILY_USAGE_COUNT).unwrap().as_deref(),
            Some("3")
        );

        store.set(keys::DAILY_USAGE_COUNT, "4").unwrap();
        assert_eq!(
            store.get(keys::DAILY_USAGE_COUNT).unwrap().as_deref(),
            Some("4")
        );

        store.remove(keys::DAILY_USAGE_COUNT).unwrap();
        assert_eq!(store.get(keys::DAILY_USAGE_COUNT).unwrap(), None);

        // removing again is fine
        store.remove(keys::DAILY_USAGE_COUNT).unwrap();
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");
        {
            let store = SqliteStore::new_with_path(&path).unwrap();
            store.set("selectedPrompt", "\"x\"").unwrap();
        }
        let store = SqliteStore::new_with_path(&path).unwrap();
        assert_eq!(store.get("selectedPrompt").unwrap().as_deref(), Some("\"x\""));
    }

    #[test]
    fn test_sqlite_store_new_uses_configured_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("configured.db");
        let config = StorageConfig {
            db_path: Some(path.to_string_lossy().to_string()),
        };
        let store = SqliteStore::new(&config).unwrap();
        assert_eq!(store.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn test_json_helpers_roundtrip() {
        let store = MemoryStore::new();
        let sample = Sample {
            name: "a".to_string(),
            count: 2,
        };
        save_json(&store, "sample", &sample);
        assert_eq!(load_json::<Sample>(&store, "sample"), Some(sample));
    }

    #[test]
    fn test_load_json_discards_garbage() {
        let store = MemoryStore::new();
        store.set("sample", "{not json").unwrap();
        assert_eq!(load_json::<Sample>(&store, "sample"), None);
    }

    #[test]
    fn test_json_helpers_swallow_store_errors() {
        let store = BrokenStore;
        save_json(&store, "sample", &1u32);
        assert_eq!(load_json::<u32>(&store, "sample"), None);
    }
}
