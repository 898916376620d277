//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DurableStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DurableStore, StorageResult, UrlRecord};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::info;

/// SQLite-backed URL ledger
///
/// Runs in WAL mode with `synchronous = FULL`, so each committed statement
/// has been fsynced by the time it returns.
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Opens or creates the ledger at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory ledger (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Returns true if a ledger file exists at `path`
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Deletes the ledger at `path` along with its WAL side files
    pub fn remove(path: &Path) -> StorageResult<()> {
        for file in ledger_files(path) {
            match std::fs::remove_file(&file) {
                Ok(()) => info!("Removed {}", file.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn ledger_files(path: &Path) -> [PathBuf; 3] {
    let with_suffix = |suffix: &str| {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    };
    [path.to_path_buf(), with_suffix("-wal"), with_suffix("-shm")]
}

impl DurableStore for SqliteLedger {
    fn get(&self, key: &str) -> StorageResult<Option<UrlRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT url, completed, depth FROM urls WHERE key = ?1",
                params![key],
                |row| {
                    Ok(UrlRecord {
                        url: row.get(0)?,
                        completed: row.get(1)?,
                        depth: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn put(&mut self, key: &str, record: &UrlRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO urls (key, url, completed, depth) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                url = excluded.url,
                completed = excluded.completed,
                depth = excluded.depth",
            params![key, record.url, record.completed, record.depth],
        )?;
        Ok(())
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM urls WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn scan_incomplete(&self) -> StorageResult<Vec<(String, UrlRecord)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, url, completed, depth FROM urls WHERE completed = 0")?;

        let records = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    UrlRecord {
                        url: row.get(1)?,
                        completed: row.get(2)?,
                        depth: row.get(3)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn len(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
