// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! SQLite-backed key-value slot

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::StateStorage;
use crate::{Result, ScanVaultError};

/// Key-value table in a SQLite database (thread-safe wrapper)
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        storage.initialize()?;
        Ok(storage)
    }

    /// Open the database, moving an unreadable file aside and starting fresh
    pub fn open_or_recover<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(storage) => Ok(storage),
            Err(e) if path.is_file() => {
                let mut aside = path.as_os_str().to_os_string();
                aside.push(format!(".corrupt-{}", Utc::now().format("%Y%m%d%H%M%S")));
                let aside = PathBuf::from(aside);
                warn!("Cannot open database {:?} ({}), moving it to {:?}", path, e, aside);
                std::fs::rename(path, &aside)?;
                Self::open(path)
            }
            Err(e) => Err(e),
        }
    }

    /// Open an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        storage.initialize()?;
        Ok(storage)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| ScanVaultError::Persistence("Database lock poisoned".to_string()))
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#)?;
        Ok(())
    }
}

impl StateStorage for SqliteStorage {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO kv_store (key, value, updated_at)
               VALUES (?1, ?2, datetime('now'))"#,
            params![key, value],
        )?;
        Ok(())
    }
}
