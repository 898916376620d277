//! Storage traits and error types
//!
//! This module defines the trait interface for the durable URL ledger and
//! the record type it stores.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A ledger entry for one discovered URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    /// The normalized URL as first discovered
    pub url: String,
    /// Whether processing of the URL has finished
    pub completed: bool,
    /// Link distance from the nearest seed
    pub depth: u32,
}

impl UrlRecord {
    /// Creates a record for a freshly discovered URL
    pub fn pending(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            completed: false,
            depth,
        }
    }
}

/// Trait for durable key/value ledgers of discovered URLs
///
/// Every mutation must be on stable storage before the call returns. Keys
/// are produced by [`crate::url::url_key`].
pub trait DurableStore: Send {
    /// Looks up a record by key
    fn get(&self, key: &str) -> StorageResult<Option<UrlRecord>>;

    /// Inserts or replaces the record under `key`
    fn put(&mut self, key: &str, record: &UrlRecord) -> StorageResult<()>;

    /// Returns true if a record exists under `key`
    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Returns every record whose `completed` flag is false
    fn scan_incomplete(&self) -> StorageResult<Vec<(String, UrlRecord)>>;

    /// Counts all records
    fn len(&self) -> StorageResult<u64>;

    /// Returns true if the ledger holds no records
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}
