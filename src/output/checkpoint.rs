//! Durable JSON checkpoints of the aggregate statistics

use crate::output::stats::{AggregationStore, StatsSnapshot};
use crate::output::summary::append_summary;
use crate::output::{OutputError, OutputResult};
use serde::{Serialize, Serializer};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

pub const UNIQUE_PAGES_FILE: &str = "unique_pages_count.json";
pub const LONGEST_PAGE_FILE: &str = "longest_content_page.json";
pub const TOP_WORDS_FILE: &str = "top50_common_words.json";
pub const SUBDOMAINS_FILE: &str = "subdomains_stats.json";
pub const SUMMARY_FILE: &str = "final_results_summary.txt";

/// Serializes `(key, count)` pairs as a JSON object in slice order
struct OrderedMap<'a>(&'a [(String, u64)]);

impl Serialize for OrderedMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

/// Writes statistics snapshots into the output directory
#[derive(Debug, Clone)]
pub struct Checkpoint {
    directory: PathBuf,
}

impl Checkpoint {
    /// Creates the output directory if needed
    pub fn new(directory: impl Into<PathBuf>) -> OutputResult<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Writes every artifact and appends a summary block
    ///
    /// A failing artifact is logged and the others are still written; the
    /// result reports how many failed.
    pub fn flush(&self, store: &AggregationStore) -> OutputResult<()> {
        let stats = store.snapshot();
        let mut failures = 0;

        for (name, result) in self.write_artifacts(&stats) {
            if let Err(e) = result {
                error!("Failed to write {}: {}", name, e);
                failures += 1;
            }
        }

        if let Err(e) = append_summary(&self.directory.join(SUMMARY_FILE), &stats) {
            error!("Failed to append {}: {}", SUMMARY_FILE, e);
            failures += 1;
        }

        debug!(
            unique_pages = stats.unique_pages,
            failures, "Checkpoint flushed"
        );

        if failures > 0 {
            return Err(OutputError::Checkpoint(failures));
        }
        Ok(())
    }

    fn write_artifacts(&self, stats: &StatsSnapshot) -> Vec<(&'static str, OutputResult<()>)> {
        let top_words = stats.top_words();
        let subdomains = stats.subdomains_sorted();

        vec![
            (
                UNIQUE_PAGES_FILE,
                self.write_json(UNIQUE_PAGES_FILE, &stats.unique_pages),
            ),
            (
                LONGEST_PAGE_FILE,
                self.write_json(LONGEST_PAGE_FILE, &stats.longest_page),
            ),
            (
                TOP_WORDS_FILE,
                self.write_json(TOP_WORDS_FILE, &OrderedMap(&top_words)),
            ),
            (
                SUBDOMAINS_FILE,
                self.write_json(SUBDOMAINS_FILE, &OrderedMap(&subdomains)),
            ),
        ]
    }

    /// Replaces `name` with the JSON of `value` under an exclusive lock
    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> OutputResult<()> {
        let json = serde_json::to_vec(value)?;
        let path = self.directory.join(name);

        // truncated only while the lock is held
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.lock()?;
        let written = file
            .set_len(0)
            .and_then(|()| file.write_all(&json))
            .and_then(|()| file.sync_all());
        file.unlock()?;
        written?;

        Ok(())
    }
}
