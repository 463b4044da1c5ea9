//! SQLite storage backend.
//!
//! Stores each namespace as one row of serialized JSON in `<data-dir>/store.db`.

use super::backend::StorageBackend;
use crate::Result;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

/// File name of the database inside the data directory.
pub const STORE_DB: &str = "store.db";

/// Storage backend backed by a SQLite key-value table.
pub struct SqliteBackend {
    path: PathBuf,
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) the database under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(STORE_DB);
        let conn = Connection::open(&path)?;
        Self::init_schema(&conn)?;
        Ok(Self { path, conn })
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl StorageBackend for SqliteBackend {
    fn read(&self, namespace: &str) -> Result<Option<serde_json::Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE namespace = ?1",
                [namespace],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn write(&mut self, namespace: &str, value: &serde_json::Value) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (namespace, value) VALUES (?1, ?2)",
            params![namespace, text],
        )?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM kv", [])?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn backend_type(&self) -> &'static str {
        "sqlite"
    }
}
