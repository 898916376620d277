//! Storage module for the durable URL ledger
//!
//! This module handles all database operations for the crawler:
//! - SQLite database initialization and schema management
//! - Durable per-URL records (`url`, `completed`, `depth`)
//! - Scanning incomplete records for crawl resumption

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteLedger;
pub use traits::{DurableStore, StorageError, StorageResult, UrlRecord};

use std::path::Path;

/// Opens the ledger at `path`, deleting any previous one first when `restart` is set
pub fn open_ledger(path: &Path, restart: bool) -> StorageResult<SqliteLedger> {
    if restart && SqliteLedger::exists(path) {
        SqliteLedger::remove(path)?;
    }
    SqliteLedger::open(path)
}
