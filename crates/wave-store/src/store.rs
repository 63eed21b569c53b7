use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use wave_core::BlobStore;
use wave_core::time::{millis_to_iso8601, now_unix_millis};

use crate::error::Result;
use crate::schema;

/// SQLite-backed key/value store. One row per blob key.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        tracing::debug!(path = %path.display(), "opened blob store");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> Result<Option<i64>> {
        schema::get_schema_version(&self.conn)
    }

    // --- Blobs ---

    pub fn get_blob(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM blobs WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_blob(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = millis_to_iso8601(now_unix_millis());
        self.conn.execute(
            "INSERT OR REPLACE INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, updated_at],
        )?;
        Ok(())
    }

    /// Delete every blob whose key starts with `prefix`. Compared with
    /// `substr` rather than `LIKE` so `_` and `%` in keys stay literal.
    pub fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM blobs WHERE substr(key, 1, length(?1)) = ?1",
            [prefix],
        )?;
        Ok(removed)
    }

    pub fn blob_keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM blobs ORDER BY key")?;
        let keys: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        Ok(keys)
    }
}

impl BlobStore for Store {
    fn get(&self, key: &str) -> wave_core::Result<Option<String>> {
        Ok(self.get_blob(key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> wave_core::Result<()> {
        Ok(self.set_blob(key, value)?)
    }

    fn remove_all_with_prefix(&mut self, prefix: &str) -> wave_core::Result<usize> {
        Ok(self.delete_prefix(prefix)?)
    }
}
