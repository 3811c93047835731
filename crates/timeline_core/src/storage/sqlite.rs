//! SQLite-backed blob storage.

use super::{normalize_key, BlobStorage, StorageResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Blob storage over the `local_storage` table.
pub struct SqliteBlobStorage<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBlobStorage<'conn> {
    /// Wraps a connection returned by `db::open_db*` (migrations applied).
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BlobStorage for SqliteBlobStorage<'_> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let key = normalize_key(key)?;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let key = normalize_key(key)?;
        self.conn.execute(
            "INSERT INTO local_storage (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let key = normalize_key(key)?;
        self.conn
            .execute("DELETE FROM local_storage WHERE key = ?1;", [key])?;
        Ok(())
    }
}
