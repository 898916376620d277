//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The frontier of pending URLs over the durable ledger
//! - Per-domain politeness and content deduplication
//! - HTTP fetching, content filtering and HTML extraction
//! - Worker threads and overall crawl coordination

mod coordinator;
mod dedup;
mod fetcher;
mod filter;
mod frontier;
mod parser;
mod politeness;
pub mod text;
mod worker;

pub use coordinator::Crawler;
pub use dedup::{exact_fingerprint, simhash, DedupEngine};
pub use fetcher::{build_http_client, Downloader, HttpDownloader, PageResponse};
pub use filter::{
    check_date_range, check_size, check_type_and_pattern, check_url_pattern, max_date, min_date,
    FilterResult, Rejection, MAX_CONTENT_SIZE,
};
pub use frontier::{Frontier, FrontierEntry, MAX_DEPTH};
pub use parser::{parse_links, ContentExtractor, Extracted, HtmlExtractor};
pub use politeness::{PolitenessController, MIN_DOMAIN_INTERVAL};
pub use worker::{CrawlContext, Outcome, Worker};
