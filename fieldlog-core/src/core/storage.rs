//! Low-level SQLite handle: schema bootstrap, validation, and migration.

use crate::{FieldlogError, Result};
use rusqlite::Connection;
use std::path::Path;

/// Current on-disk schema version. Bump when [`Storage::open`] learns a new
/// migration step. Migrations are monotonic and idempotent: opening an
/// already-migrated store is a no-op.
pub const SCHEMA_VERSION: u32 = 2;

pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Creates a new store database at `path` and initialises the schema.
    ///
    /// # Errors
    ///
    /// Returns [`FieldlogError::StoreUnavailable`] if the file cannot be
    /// opened (permission denied, missing directory), or
    /// [`FieldlogError::Database`] for any other SQLite failure.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| FieldlogError::StoreUnavailable(e.to_string()))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.execute(
            "INSERT OR IGNORE INTO store_meta (key, value) VALUES ('schema_version', ?1)",
            [SCHEMA_VERSION.to_string()],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO store_meta (key, value) VALUES ('last_report_id', '0')",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Opens an existing store database at `path`.
    ///
    /// Validates the database structure, then applies any pending schema
    /// migration synchronously: `open` does not return until the store is
    /// fully migrated, so no caller ever observes a half-indexed store.
    ///
    /// # Errors
    ///
    /// Returns [`FieldlogError::StoreUnavailable`] if the file cannot be
    /// opened, has a corrupt header, or is not a Fieldlog store, or
    /// [`FieldlogError::Database`] if migration fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| FieldlogError::StoreUnavailable(e.to_string()))?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| FieldlogError::StoreUnavailable(e.to_string()))?;

        // Validate database structure. The query itself fails on a corrupt
        // or non-SQLite file, which is the same condition as missing tables.
        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type='table'
                 AND name IN ('reports', 'attachments', 'store_meta')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| FieldlogError::StoreUnavailable(e.to_string()))?;

        if table_count != 3 {
            return Err(FieldlogError::StoreUnavailable(
                "Not a valid Fieldlog store".to_string(),
            ));
        }

        let mut storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    /// Brings an older on-disk schema up to [`SCHEMA_VERSION`].
    ///
    /// Version 1 stores predate the `(created_at DESC, id DESC)` ordering
    /// index; the index is built here, once, before the store is handed to
    /// callers. Re-running on a current store changes nothing.
    fn migrate(&mut self) -> Result<()> {
        let version = self.schema_version()?;
        if version >= SCHEMA_VERSION {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "CREATE INDEX IF NOT EXISTS idx_reports_created_at
             ON reports(created_at DESC, id DESC)",
            [],
        )?;
        tx.execute(
            "INSERT INTO store_meta (key, value) VALUES ('schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [SCHEMA_VERSION.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Reads the on-disk schema version. Stores written before versioning
    /// was introduced carry no `schema_version` row and count as version 1.
    pub fn schema_version(&self) -> Result<u32> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        match value {
            Some(v) => v.parse::<u32>().map_err(|_| {
                FieldlogError::StoreUnavailable(format!("Corrupt schema version: {v}"))
            }),
            None => Ok(1),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_create_storage() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::create(temp.path()).unwrap();

        let tables: Vec<String> = storage
            .connection()
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();

        assert!(tables.contains(&"reports".to_string()));
        assert!(tables.contains(&"attachments".to_string()));
        assert!(tables.contains(&"store_meta".to_string()));
        assert_eq!(storage.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_open_existing_storage() {
        let temp = NamedTempFile::new().unwrap();
        Storage::create(temp.path()).unwrap();

        let storage = Storage::open(temp.path()).unwrap();
        assert_eq!(storage.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_open_invalid_database() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "not a database").unwrap();

        let result = Storage::open(temp.path());
        assert!(matches!(result, Err(FieldlogError::StoreUnavailable(_))));
    }

    #[test]
    fn test_open_foreign_sqlite_database() {
        let temp = NamedTempFile::new().unwrap();
        {
            let conn = Connection::open(temp.path()).unwrap();
            conn.execute("CREATE TABLE somebody_elses (id INTEGER PRIMARY KEY)", [])
                .unwrap();
        }

        let result = Storage::open(temp.path());
        assert!(matches!(result, Err(FieldlogError::StoreUnavailable(_))));
    }

    /// Builds a version-1 store by hand: the three tables, no ordering
    /// index, no schema_version row.
    fn create_v1_store(path: &std::path::Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute(
            "CREATE TABLE reports (
                id INTEGER PRIMARY KEY,
                category TEXT NOT NULL,
                status TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                latitude REAL,
                longitude REAL,
                accuracy_meters REAL,
                created_at INTEGER NOT NULL
            )",
            [],
        )
        .unwrap();
        conn.execute(
            "CREATE TABLE attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                report_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                bytes BLOB NOT NULL,
                mime_type TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                source_name TEXT NOT NULL,
                captured_at INTEGER NOT NULL
            )",
            [],
        )
        .unwrap();
        conn.execute(
            "CREATE TABLE store_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO store_meta (key, value) VALUES ('last_report_id', '0')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_migration_builds_ordering_index() {
        let temp = NamedTempFile::new().unwrap();
        create_v1_store(temp.path());

        let storage = Storage::open(temp.path()).unwrap();

        let index_exists: bool = storage
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type='index' AND name='idx_reports_created_at'",
                [],
                |row| row.get::<_, i64>(0).map(|count| count > 0),
            )
            .unwrap();
        assert!(index_exists, "ordering index should exist after migration");
        assert_eq!(storage.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        create_v1_store(temp.path());

        // First open migrates, second open must be a no-op.
        drop(Storage::open(temp.path()).unwrap());
        let storage = Storage::open(temp.path()).unwrap();

        let index_count: i64 = storage
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type='index' AND name='idx_reports_created_at'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(index_count, 1);
        assert_eq!(storage.schema_version().unwrap(), SCHEMA_VERSION);
    }
}
