//! Frontier of URLs waiting to be crawled
//!
//! This module handles:
//! - Priority queue of pending URLs (per-domain discovery order)
//! - Depth tracking from the seeds, capped at [`MAX_DEPTH`]
//! - Durable bookkeeping of every discovered URL in the ledger
//! - Resuming an interrupted crawl from the ledger

use crate::config::CrawlerConfig;
use crate::storage::{open_ledger, DurableStore, SqliteLedger, StorageResult, UrlRecord};
use crate::url::{extract_domain, normalize_url, url_key, UrlValidator};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};

/// URLs more than this many links away from a seed are dropped
pub const MAX_DEPTH: u32 = 500;

/// A URL queued for fetching with its priority
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    /// Priority value (lower is popped first)
    pub priority: u64,

    /// The normalized URL
    pub url: String,
}

// BinaryHeap is a max-heap, so both comparisons are reversed: the smallest
// priority pops first, ties going to the lexicographically smaller URL.
impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.url.cmp(&self.url))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.url == other.url
    }
}

impl Eq for FrontierEntry {}

struct FrontierState {
    queue: BinaryHeap<FrontierEntry>,
    depths: HashMap<String, u32>,
    domain_counts: HashMap<String, u64>,
    ledger: Box<dyn DurableStore>,
}

/// Frontier shared by all workers
///
/// A single mutex guards the queue, the depth table, the per-domain counters
/// and the ledger handle, so a URL is never enqueued without its ledger
/// record having been written first.
pub struct Frontier {
    state: Mutex<FrontierState>,
}

impl Frontier {
    /// Opens the frontier over the SQLite ledger named in `config`
    ///
    /// With `restart`, an existing ledger is deleted and the crawl starts
    /// from the seeds. Otherwise incomplete records are re-enqueued, and the
    /// seeds are only used if the ledger turns out to be empty.
    pub fn open(
        config: &CrawlerConfig,
        restart: bool,
        validator: &dyn UrlValidator,
    ) -> StorageResult<Self> {
        let path = Path::new(&config.ledger_path);
        let exists = SqliteLedger::exists(path);

        if !exists && !restart {
            info!(
                "Did not find ledger {}, starting from seeds",
                path.display()
            );
        } else if exists && restart {
            info!("Found ledger {}, deleting it", path.display());
        }

        let ledger = open_ledger(path, restart)?;
        Self::with_store(Box::new(ledger), &config.seeds, !restart, validator)
    }

    /// Builds a frontier over an already opened store
    pub fn with_store(
        ledger: Box<dyn DurableStore>,
        seeds: &[String],
        resume: bool,
        validator: &dyn UrlValidator,
    ) -> StorageResult<Self> {
        let frontier = Self {
            state: Mutex::new(FrontierState {
                queue: BinaryHeap::new(),
                depths: HashMap::new(),
                domain_counts: HashMap::new(),
                ledger,
            }),
        };

        if resume {
            frontier.resume(validator)?;
        }

        if !resume || frontier.ledger_len()? == 0 {
            for seed in seeds {
                frontier.add_url(seed, None)?;
            }
        }

        Ok(frontier)
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resume(&self, validator: &dyn UrlValidator) -> StorageResult<()> {
        let mut state = self.lock();
        let total = state.ledger.len()?;
        let mut pending = 0u64;

        for (_, record) in state.ledger.scan_incomplete()? {
            if !validator.is_valid(&record.url, None) {
                debug!("Skipping out-of-scope record {}", record.url);
                continue;
            }
            state.depths.insert(record.url.clone(), record.depth);
            state.queue.push(FrontierEntry {
                priority: u64::from(record.depth),
                url: record.url,
            });
            pending += 1;
        }

        info!(
            "Found {} urls to be downloaded from {} total urls discovered",
            pending, total
        );
        Ok(())
    }

    /// Adds a discovered URL to the frontier
    ///
    /// Returns `Ok(true)` if the URL was new and enqueued. URLs already in the
    /// ledger, unparseable URLs and URLs beyond [`MAX_DEPTH`] are ignored.
    pub fn add_url(&self, url: &str, parent: Option<&str>) -> StorageResult<bool> {
        let normalized = match normalize_url(url) {
            Ok(normalized) => normalized,
            Err(e) => {
                debug!("Dropping unparseable URL {}: {}", url, e);
                return Ok(false);
            }
        };
        let key = url_key(&normalized);
        let domain = extract_domain(&normalized).unwrap_or_default();
        let url = normalized.to_string();

        let mut state = self.lock();
        if state.ledger.contains(&key)? {
            return Ok(false);
        }

        let depth = match parent {
            Some(parent) => {
                let parent = normalize_url(parent)
                    .map(|p| p.to_string())
                    .unwrap_or_else(|_| parent.to_string());
                state.depths.get(&parent).copied().unwrap_or(0) + 1
            }
            None => 0,
        };

        if depth > MAX_DEPTH {
            info!("URL {} is too deep ({}), skipping", url, depth);
            return Ok(false);
        }

        state.ledger.put(&key, &UrlRecord::pending(url.clone(), depth))?;

        let count = state.domain_counts.entry(domain).or_insert(0);
        *count += 1;
        let priority = *count;

        state.queue.push(FrontierEntry {
            priority,
            url: url.clone(),
        });
        state.depths.insert(url, depth);
        Ok(true)
    }

    /// Pops the next URL to crawl, `None` once the queue is drained
    pub fn get_next_url(&self) -> Option<String> {
        self.lock().queue.pop().map(|entry| entry.url)
    }

    /// Marks a URL as fully processed in the ledger
    ///
    /// Completing a URL the ledger has never seen is logged and ignored.
    pub fn mark_complete(&self, url: &str) -> StorageResult<()> {
        let key = match normalize_url(url) {
            Ok(normalized) => url_key(&normalized),
            Err(e) => {
                error!("Completed url {}, but it does not parse: {}", url, e);
                return Ok(());
            }
        };

        let mut state = self.lock();
        match state.ledger.get(&key)? {
            None => {
                error!("Completed url {}, but have not seen it before", url);
                Ok(())
            }
            Some(record) if record.completed => Ok(()),
            Some(mut record) => {
                record.completed = true;
                state.ledger.put(&key, &record)
            }
        }
    }

    /// Number of URLs waiting in the queue
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns true if no URLs are waiting
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Depth recorded for a URL, if it was enqueued in this process
    pub fn depth_of(&self, url: &str) -> Option<u32> {
        let normalized = normalize_url(url).ok()?.to_string();
        self.lock().depths.get(&normalized).copied()
    }

    /// Returns true if the ledger holds a record for the URL
    pub fn contains(&self, url: &str) -> StorageResult<bool> {
        Ok(self.record(url)?.is_some())
    }

    /// Looks up the ledger record for a URL
    pub fn record(&self, url: &str) -> StorageResult<Option<UrlRecord>> {
        match normalize_url(url) {
            Ok(normalized) => self.lock().ledger.get(&url_key(&normalized)),
            Err(_) => Ok(None),
        }
    }

    /// Number of records in the ledger
    pub fn ledger_len(&self) -> StorageResult<u64> {
        self.lock().ledger.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::AggregationStore;
    use crate::storage::SqliteLedger;

    struct AcceptAll;

    impl UrlValidator for AcceptAll {
        fn is_valid(&self, _url: &str, _visited: Option<&AggregationStore>) -> bool {
            true
        }
    }

    struct RejectPath(&'static str);

    impl UrlValidator for RejectPath {
        fn is_valid(&self, url: &str, _visited: Option<&AggregationStore>) -> bool {
            !url.contains(self.0)
        }
    }

    fn empty_frontier() -> Frontier {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        Frontier::with_store(Box::new(ledger), &[], false, &AcceptAll).unwrap()
    }

    #[test]
    fn test_entry_ordering() {
        let mut heap = BinaryHeap::new();
        heap.push(FrontierEntry {
            priority: 2,
            url: "https://a.ics.uci.edu/".to_string(),
        });
        heap.push(FrontierEntry {
            priority: 1,
            url: "https://z.ics.uci.edu/".to_string(),
        });
        heap.push(FrontierEntry {
            priority: 1,
            url: "https://b.ics.uci.edu/".to_string(),
        });

        assert_eq!(heap.pop().unwrap().url, "https://b.ics.uci.edu/");
        assert_eq!(heap.pop().unwrap().url, "https://z.ics.uci.edu/");
        assert_eq!(heap.pop().unwrap().url, "https://a.ics.uci.edu/");
    }

    #[test]
    fn test_seeds_added_on_fresh_start() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let seeds = vec![
            "https://www.ics.uci.edu".to_string(),
            "https://www.cs.uci.edu".to_string(),
        ];
        let frontier = Frontier::with_store(Box::new(ledger), &seeds, true, &AcceptAll).unwrap();

        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier.ledger_len().unwrap(), 2);
        assert_eq!(frontier.depth_of("https://www.ics.uci.edu/"), Some(0));
    }

    #[test]
    fn test_add_url_is_idempotent() {
        let frontier = empty_frontier();

        assert!(frontier.add_url("https://www.ics.uci.edu/a", None).unwrap());
        assert!(!frontier.add_url("https://www.ics.uci.edu/a/", None).unwrap());
        assert!(!frontier.add_url("http://www.ics.uci.edu/a#x", None).unwrap());

        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.ledger_len().unwrap(), 1);
    }

    #[test]
    fn test_depth_from_parent() {
        let frontier = empty_frontier();
        frontier.add_url("https://www.ics.uci.edu/", None).unwrap();
        frontier
            .add_url("https://www.ics.uci.edu/a", Some("https://www.ics.uci.edu/"))
            .unwrap();
        frontier
            .add_url("https://www.ics.uci.edu/a/b", Some("https://www.ics.uci.edu/a"))
            .unwrap();
        frontier
            .add_url("https://www.ics.uci.edu/c", Some("https://unknown.ics.uci.edu/"))
            .unwrap();

        assert_eq!(frontier.depth_of("https://www.ics.uci.edu/a"), Some(1));
        assert_eq!(frontier.depth_of("https://www.ics.uci.edu/a/b"), Some(2));
        assert_eq!(frontier.depth_of("https://www.ics.uci.edu/c"), Some(1));
        assert_eq!(
            frontier
                .record("https://www.ics.uci.edu/a/b")
                .unwrap()
                .unwrap()
                .depth,
            2
        );
    }

    #[test]
    fn test_max_depth_enforced() {
        let frontier = empty_frontier();
        let mut parent = "https://www.ics.uci.edu/0".to_string();
        frontier.add_url(&parent, None).unwrap();

        for i in 1..=MAX_DEPTH {
            let child = format!("https://www.ics.uci.edu/{}", i);
            assert!(frontier.add_url(&child, Some(&parent)).unwrap());
            parent = child;
        }

        let too_deep = format!("https://www.ics.uci.edu/{}", MAX_DEPTH + 1);
        assert!(!frontier.add_url(&too_deep, Some(&parent)).unwrap());
        assert!(!frontier.contains(&too_deep).unwrap());
        assert_eq!(frontier.depth_of(&parent), Some(MAX_DEPTH));
    }

    #[test]
    fn test_per_domain_priority() {
        let frontier = empty_frontier();
        frontier.add_url("https://a.ics.uci.edu/1", None).unwrap();
        frontier.add_url("https://a.ics.uci.edu/2", None).unwrap();
        frontier.add_url("https://b.ics.uci.edu/1", None).unwrap();

        // both first-of-domain URLs (priority 1) come before a.ics.uci.edu/2
        assert_eq!(
            frontier.get_next_url().as_deref(),
            Some("https://a.ics.uci.edu/1")
        );
        assert_eq!(
            frontier.get_next_url().as_deref(),
            Some("https://b.ics.uci.edu/1")
        );
        assert_eq!(
            frontier.get_next_url().as_deref(),
            Some("https://a.ics.uci.edu/2")
        );
        assert_eq!(frontier.get_next_url(), None);
    }

    #[test]
    fn test_invalid_url_dropped() {
        let frontier = empty_frontier();
        assert!(!frontier.add_url("not a url", None).unwrap());
        assert!(!frontier.add_url("ftp://ics.uci.edu/file", None).unwrap());
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_mark_complete() {
        let frontier = empty_frontier();
        frontier.add_url("https://www.ics.uci.edu/a", None).unwrap();

        frontier.mark_complete("https://www.ics.uci.edu/a/").unwrap();
        frontier.mark_complete("https://www.ics.uci.edu/a").unwrap();

        let record = frontier.record("https://www.ics.uci.edu/a").unwrap().unwrap();
        assert!(record.completed);
    }

    #[test]
    fn test_mark_complete_unknown_is_not_an_error() {
        let frontier = empty_frontier();
        frontier.mark_complete("https://www.ics.uci.edu/never").unwrap();
        assert_eq!(frontier.ledger_len().unwrap(), 0);
    }

    #[test]
    fn test_resume_requeues_incomplete_records() {
        let mut ledger = SqliteLedger::open_in_memory().unwrap();
        let urls = [
            ("https://www.ics.uci.edu/done", true, 0),
            ("https://www.ics.uci.edu/a", false, 3),
            ("https://www.ics.uci.edu/b", false, 1),
            ("https://www.ics.uci.edu/private/x", false, 1),
        ];
        for (url, completed, depth) in urls {
            let normalized = normalize_url(url).unwrap();
            ledger
                .put(
                    &url_key(&normalized),
                    &UrlRecord {
                        url: normalized.to_string(),
                        completed,
                        depth,
                    },
                )
                .unwrap();
        }

        let seeds = vec!["https://www.ics.uci.edu/seed".to_string()];
        let frontier =
            Frontier::with_store(Box::new(ledger), &seeds, true, &RejectPath("/private/"))
                .unwrap();

        // seeds are ignored because the ledger is not empty
        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier.depth_of("https://www.ics.uci.edu/a"), Some(3));
        assert_eq!(
            frontier.get_next_url().as_deref(),
            Some("https://www.ics.uci.edu/b")
        );
        assert_eq!(
            frontier.get_next_url().as_deref(),
            Some("https://www.ics.uci.edu/a")
        );

        // a resumed parent passes its stored depth on
        frontier
            .add_url("https://www.ics.uci.edu/a/child", Some("https://www.ics.uci.edu/a"))
            .unwrap();
        assert_eq!(frontier.depth_of("https://www.ics.uci.edu/a/child"), Some(4));
    }
}
