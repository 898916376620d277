//! Plain-text summary appended at every checkpoint
//!
//! Each flush adds one timestamped block to the summary file, so the file
//! keeps the history of the crawl's statistics.

use crate::output::stats::StatsSnapshot;
use crate::output::OutputResult;
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

const RULE: &str = "-------------------------------";

/// Formats one summary block
pub fn format_summary_block(stats: &StatsSnapshot, at: DateTime<Local>) -> String {
    let mut text = String::new();

    text.push_str(&format!(
        "Checkpoint written at {}\n",
        at.format("%Y-%m-%d %H:%M:%S")
    ));
    text.push_str(RULE);
    text.push('\n');

    text.push_str(&format!("Unique Pages Count: {}\n", stats.unique_pages));
    text.push_str(RULE);
    text.push('\n');

    text.push_str("Longest Content Page:\n");
    text.push_str(&format!(
        "URL: {}\n",
        stats.longest_page.url.as_deref().unwrap_or("None")
    ));
    text.push_str(&format!("Word Count: {}\n", stats.longest_page.word_count));
    text.push_str(RULE);
    text.push('\n');

    text.push_str("Top 50 Common Words:\n");
    for (word, count) in stats.top_words() {
        text.push_str(&format!("{}: {}\n", word, count));
    }
    text.push_str(RULE);
    text.push('\n');

    text.push_str("Subdomains Stats:\n");
    for (subdomain, count) in stats.subdomains_sorted() {
        text.push_str(&format!("{}: {}\n", subdomain, count));
    }
    text.push_str(RULE);
    text.push_str("\n\n\n");

    text
}

/// Appends a summary block to `path` under an exclusive lock, then fsyncs
pub fn append_summary(path: &Path, stats: &StatsSnapshot) -> OutputResult<()> {
    let block = format_summary_block(stats, Local::now());

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.lock()?;
    let written = file
        .write_all(block.as_bytes())
        .and_then(|()| file.sync_all());
    file.unlock()?;
    written?;

    Ok(())
}
