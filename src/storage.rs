use crate::config;
use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use rusqlite::Connection;
use std::path::Path;

/// Key persisted once the first-visit welcome has been shown. Cleared
/// on logout together with everything else in the store.
pub const WELCOME_SHOWN_KEY: &str = "welcome_shown";

/// Small key/value store backing client-side persistence, kept in a
/// SQLite file under the app data directory.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn new() -> Result<Self> {
        let path = config::get_app_data_prefix()?.join("local.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Could not create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .wrap_err_with(|| format!("Could not open local store at {}", path.display()))?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    fn init_db(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS local_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM local_store WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO local_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            rusqlite::params![key, value, Utc::now()],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM local_store WHERE key = ?1", [key])?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM local_store", [])?;
        Ok(())
    }

    pub fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT updated_at FROM local_store WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn welcome_shown(&self) -> Result<bool> {
        Ok(self.get(WELCOME_SHOWN_KEY)?.is_some())
    }

    pub fn mark_welcome_shown(&self) -> Result<()> {
        self.set(WELCOME_SHOWN_KEY, "true")
    }
}
