//! Aggregate crawl statistics
//!
//! This module accumulates the statistics reported at every checkpoint:
//! unique pages, the longest page, global word frequencies and page counts
//! per subdomain. Each accumulator sits behind its own lock; no method holds
//! two of them at once.

use crate::url::{matches_wildcard, strip_fragment};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// Number of words reported in the common-words view
pub const TOP_WORDS: usize = 50;

/// Counter that remembers the order in which keys were first seen
#[derive(Debug, Clone, Default)]
pub struct OrderedCounter {
    index: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl OrderedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `by` to the count of `key`
    pub fn add(&mut self, key: &str, by: u64) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 += by,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), by));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.index.get(key).map(|&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by descending count; equal counts keep first-seen order
    pub fn sorted_desc(&self) -> Vec<(String, u64)> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }
}

/// The page with the most counted words so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LongestPage {
    pub url: Option<String>,
    pub word_count: u64,
}

/// Point-in-time copy of every statistic, taken one lock at a time
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    pub unique_pages: usize,
    pub longest_page: LongestPage,
    pub words: OrderedCounter,
    pub subdomains: OrderedCounter,
}

impl StatsSnapshot {
    /// The [`TOP_WORDS`] most frequent words, most frequent first
    pub fn top_words(&self) -> Vec<(String, u64)> {
        let mut top = self.words.sorted_desc();
        top.truncate(TOP_WORDS);
        top
    }

    /// Subdomain page counts, largest first
    pub fn subdomains_sorted(&self) -> Vec<(String, u64)> {
        self.subdomains.sorted_desc()
    }
}

/// Shared accumulator for crawl statistics
pub struct AggregationStore {
    subdomain_suffix: String,
    visited: Mutex<HashSet<String>>,
    longest_page: Mutex<LongestPage>,
    words: Mutex<OrderedCounter>,
    subdomains: Mutex<OrderedCounter>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AggregationStore {
    /// Creates an empty store counting subdomains of `subdomain_suffix`
    pub fn new(subdomain_suffix: &str) -> Self {
        Self {
            subdomain_suffix: subdomain_suffix.to_lowercase(),
            visited: Mutex::new(HashSet::new()),
            longest_page: Mutex::new(LongestPage::default()),
            words: Mutex::new(OrderedCounter::new()),
            subdomains: Mutex::new(OrderedCounter::new()),
        }
    }

    /// Records a fetched URL (fragment stripped) as visited
    ///
    /// Returns true if the URL had not been visited before.
    pub fn record_visit(&self, url: &str) -> bool {
        lock(&self.visited).insert(strip_fragment(url))
    }

    pub fn is_visited(&self, url: &str) -> bool {
        lock(&self.visited).contains(&strip_fragment(url))
    }

    /// Counts a page against its host if the host is the configured suffix
    /// or one of its subdomains
    pub fn record_subdomain(&self, url: &str) {
        let Some(host) = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
        else {
            return;
        };

        if matches_wildcard(&format!("*.{}", self.subdomain_suffix), &host) {
            lock(&self.subdomains).add(&host, 1);
        }
    }

    /// Replaces the longest page if `word_count` beats it
    pub fn update_longest_page(&self, url: &str, word_count: u64) {
        let mut longest = lock(&self.longest_page);
        if word_count > longest.word_count {
            *longest = LongestPage {
                url: Some(url.to_string()),
                word_count,
            };
        }
    }

    /// Adds a page's word counts to the global frequencies
    pub fn merge_word_frequencies(&self, words: &[(String, u64)]) {
        let mut counter = lock(&self.words);
        for (word, count) in words {
            counter.add(word, *count);
        }
    }

    pub fn unique_pages(&self) -> usize {
        lock(&self.visited).len()
    }

    pub fn longest_page(&self) -> LongestPage {
        lock(&self.longest_page).clone()
    }

    /// Copies every statistic, taking each lock in turn
    pub fn snapshot(&self) -> StatsSnapshot {
        let unique_pages = self.unique_pages();
        let longest_page = self.longest_page();
        let words = lock(&self.words).clone();
        let subdomains = lock(&self.subdomains).clone();

        StatsSnapshot {
            unique_pages,
            longest_page,
            words,
            subdomains,
        }
    }
}

/// Prints a snapshot to stdout in a formatted manner
pub fn print_statistics(stats: &StatsSnapshot) {
    println!("=== Crawl Statistics ===\n");

    println!("Unique pages: {}", stats.unique_pages);
    match &stats.longest_page.url {
        Some(url) => println!(
            "Longest page: {} ({} words)",
            url, stats.longest_page.word_count
        ),
        None => println!("Longest page: none"),
    }
    println!();

    if !stats.words.is_empty() {
        println!("Top {} words:", TOP_WORDS);
        for (word, count) in stats.top_words() {
            println!("  {}: {}", word, count);
        }
        println!();
    }

    if !stats.subdomains.is_empty() {
        println!("Subdomains ({}):", stats.subdomains.len());
        for (subdomain, count) in stats.subdomains_sorted() {
            println!("  {}: {}", subdomain, count);
        }
    }
}
