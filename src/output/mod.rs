//! Output module for crawl statistics
//!
//! This module handles:
//! - Accumulating aggregate statistics shared by the workers
//! - Writing JSON checkpoints of those statistics
//! - Appending human-readable summary blocks

mod checkpoint;
pub mod stats;
mod summary;

pub use checkpoint::{
    Checkpoint, LONGEST_PAGE_FILE, SUBDOMAINS_FILE, SUMMARY_FILE, TOP_WORDS_FILE,
    UNIQUE_PAGES_FILE,
};
pub use stats::{print_statistics, AggregationStore, LongestPage, OrderedCounter, StatsSnapshot};
pub use summary::{append_summary, format_summary_block};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} checkpoint artifact(s) could not be written")]
    Checkpoint(usize),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
