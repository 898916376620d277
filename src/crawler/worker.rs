//! Worker threads pulling URLs from the frontier
//!
//! Each worker runs one URL at a time through
//! `Idle -> Fetching -> Filtering -> Extracting -> Idle` until the frontier
//! drains or the stop flag is raised.

use crate::crawler::dedup::DedupEngine;
use crate::crawler::fetcher::{Downloader, PageResponse};
use crate::crawler::filter::{check_date_range, check_size, check_type_and_pattern, Rejection};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::ContentExtractor;
use crate::crawler::politeness::PolitenessController;
use crate::output::AggregationStore;
use crate::state::WorkerState;
use crate::storage::StorageResult;
use crate::url::{domain_of, normalize_url, UrlValidator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Everything the workers share
pub struct CrawlContext {
    pub frontier: Frontier,
    pub politeness: PolitenessController,
    pub dedup: DedupEngine,
    pub stats: AggregationStore,
    pub downloader: Arc<dyn Downloader>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub validator: Arc<dyn UrlValidator>,

    /// Fixed sleep between two URLs of one worker
    pub delay: Duration,
}

/// What happened to a single URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Extracted, with the number of new URLs it added to the frontier
    Processed { links_added: usize },

    /// Dropped by the filter pipeline
    Rejected(Rejection),

    /// The downloader returned nothing; the URL stays incomplete
    FetchFailed,
}

/// A single crawl worker
pub struct Worker {
    id: usize,
    ctx: Arc<CrawlContext>,
    stop: Arc<AtomicBool>,
    state: WorkerState,
}

impl Worker {
    pub fn new(id: usize, ctx: Arc<CrawlContext>, stop: Arc<AtomicBool>) -> Self {
        Self {
            id,
            ctx,
            stop,
            state: WorkerState::Idle,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Processes URLs until the frontier is empty or a stop is requested
    ///
    /// The stop flag is only checked between URLs, so a page in flight is
    /// always finished. Errors on one URL are logged and never end the loop.
    pub fn run(&mut self) {
        info!(worker = self.id, "Worker started");
        let mut processed = 0u64;

        while !self.stop.load(Ordering::SeqCst) {
            self.transition(WorkerState::Idle);

            let Some(url) = self.ctx.frontier.get_next_url() else {
                info!(worker = self.id, "Frontier is empty, stopping");
                break;
            };

            match self.process_url(&url) {
                Ok(outcome) => {
                    trace!(worker = self.id, url = %url, ?outcome, "Finished url");
                    processed += 1;
                }
                Err(e) => error!(worker = self.id, url = %url, "Failed to process url: {}", e),
            }

            if !self.ctx.delay.is_zero() {
                thread::sleep(self.ctx.delay);
            }
        }

        self.transition(WorkerState::Stopped);
        info!(worker = self.id, processed, "Worker stopped");
    }

    /// Downloads, filters and extracts one URL
    pub fn process_url(&mut self, url: &str) -> StorageResult<Outcome> {
        self.transition(WorkerState::Fetching);

        let domain = domain_of(url).unwrap_or_default();
        self.ctx.politeness.wait_for_domain(&domain);
        let response = self.ctx.downloader.download(url);
        self.ctx.politeness.record_request(&domain);

        let Some(response) = response else {
            error!(worker = self.id, url, "Download failed, url stays pending");
            self.transition(WorkerState::Idle);
            return Ok(Outcome::FetchFailed);
        };

        info!(
            worker = self.id,
            url,
            status = response.status,
            "Downloaded"
        );

        let current = if is_redirect(url, &response.final_url) {
            debug!(
                worker = self.id,
                from = url,
                to = %response.final_url,
                "Followed redirect"
            );
            self.ctx.frontier.mark_complete(url)?;
            response.final_url.clone()
        } else {
            url.to_string()
        };

        self.ctx.stats.record_visit(&current);
        self.ctx.stats.record_subdomain(&current);

        self.transition(WorkerState::Filtering);
        if let Err(rejection) = self.filter(&current, &response) {
            info!(worker = self.id, url = %current, "Skipping: {}", rejection);
            self.ctx.frontier.mark_complete(&current)?;
            self.transition(WorkerState::Idle);
            return Ok(Outcome::Rejected(rejection));
        }

        self.transition(WorkerState::Extracting);
        let extracted = self.ctx.extractor.extract(&response);
        self.ctx
            .stats
            .update_longest_page(&current, extracted.word_count());
        self.ctx.stats.merge_word_frequencies(&extracted.words);

        let mut links_added = 0;
        for link in &extracted.links {
            if !self.ctx.validator.is_valid(link, Some(&self.ctx.stats)) {
                continue;
            }
            if self.ctx.frontier.add_url(link, Some(current.as_str()))? {
                links_added += 1;
            }
        }

        self.ctx.frontier.mark_complete(&current)?;
        debug!(
            worker = self.id,
            url = %current,
            links = extracted.links.len(),
            links_added,
            "Extracted"
        );

        self.transition(WorkerState::Idle);
        Ok(Outcome::Processed { links_added })
    }

    /// Duplicate, size, type/pattern and date checks, in that order
    fn filter(&self, url: &str, response: &PageResponse) -> Result<(), Rejection> {
        if self.ctx.dedup.check_and_record_exact(&response.content) {
            return Err(Rejection::DuplicateContent);
        }
        if self.ctx.dedup.check_and_record_near(&response.content) {
            return Err(Rejection::NearDuplicateContent);
        }
        check_size(response)?;
        check_type_and_pattern(url, response)?;
        check_date_range(url, &response.content)
    }

    fn transition(&mut self, next: WorkerState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            warn!(
                worker = self.id,
                "Unexpected state change {} -> {}", self.state, next
            );
        }
        trace!(worker = self.id, from = %self.state, to = %next, "State change");
        self.state = next;
    }
}

/// True when the downloader ended up somewhere other than `requested`
fn is_redirect(requested: &str, final_url: &str) -> bool {
    if final_url.is_empty() {
        return false;
    }
    match (normalize_url(requested), normalize_url(final_url)) {
        (Ok(a), Ok(b)) => a != b,
        _ => requested != final_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::filter::MAX_CONTENT_SIZE;
    use crate::crawler::parser::HtmlExtractor;
    use crate::storage::SqliteLedger;
    use crate::url::ScopeValidator;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct StaticDownloader {
        pages: HashMap<String, PageResponse>,
    }

    impl Downloader for StaticDownloader {
        fn download(&self, url: &str) -> Option<PageResponse> {
            self.pages.get(url).cloned()
        }
    }

    fn page(url: &str, body: &str) -> PageResponse {
        PageResponse {
            status: 200,
            final_url: url.to_string(),
            content: body.as_bytes().to_vec(),
            headers: HashMap::new(),
        }
    }

    fn context(seeds: &[&str], pages: Vec<PageResponse>) -> Arc<CrawlContext> {
        context_with(seeds, pages.into_iter().map(|p| (p.final_url.clone(), p)))
    }

    fn context_with(
        seeds: &[&str],
        pages: impl IntoIterator<Item = (String, PageResponse)>,
    ) -> Arc<CrawlContext> {
        let validator: Arc<dyn UrlValidator> =
            Arc::new(ScopeValidator::new(vec!["*.ics.uci.edu".to_string()]));
        let seeds: Vec<String> = seeds.iter().map(|s| s.to_string()).collect();
        let frontier = Frontier::with_store(
            Box::new(SqliteLedger::open_in_memory().unwrap()),
            &seeds,
            false,
            validator.as_ref(),
        )
        .unwrap();

        Arc::new(CrawlContext {
            frontier,
            politeness: PolitenessController::with_floor(Duration::ZERO, Duration::ZERO),
            dedup: DedupEngine::new(),
            stats: AggregationStore::new("ics.uci.edu"),
            downloader: Arc::new(StaticDownloader {
                pages: pages.into_iter().collect(),
            }),
            extractor: Arc::new(HtmlExtractor::new()),
            validator,
            delay: Duration::ZERO,
        })
    }

    fn worker(ctx: &Arc<CrawlContext>) -> Worker {
        Worker::new(0, ctx.clone(), Arc::new(AtomicBool::new(false)))
    }

    const SEED: &str = "https://www.ics.uci.edu/";

    #[test]
    fn test_process_adds_in_scope_links() {
        let ctx = context(
            &[SEED],
            vec![page(
                SEED,
                r#"<html><body><p>informatics research</p>
                <a href="/about">About</a>
                <a href="/people#faculty">People</a>
                <a href="https://example.com/elsewhere">Elsewhere</a>
                <a href="/paper.pdf">Paper</a>
                </body></html>"#,
            )],
        );
        let mut worker = worker(&ctx);

        let url = ctx.frontier.get_next_url().unwrap();
        let outcome = worker.process_url(&url).unwrap();

        assert_eq!(outcome, Outcome::Processed { links_added: 2 });
        assert!(ctx.frontier.record(SEED).unwrap().unwrap().completed);
        assert_eq!(ctx.frontier.depth_of("https://www.ics.uci.edu/about"), Some(1));
        assert_eq!(ctx.frontier.len(), 2);
        assert_eq!(ctx.stats.unique_pages(), 1);
        assert_eq!(worker.state(), WorkerState::Idle);
    }

    #[test]
    fn test_fetch_failure_leaves_url_pending() {
        let ctx = context(&[SEED], vec![]);
        let mut worker = worker(&ctx);

        let url = ctx.frontier.get_next_url().unwrap();
        assert_eq!(worker.process_url(&url).unwrap(), Outcome::FetchFailed);

        assert!(!ctx.frontier.record(SEED).unwrap().unwrap().completed);
        assert_eq!(ctx.stats.unique_pages(), 0);
    }

    #[test]
    fn test_duplicate_content_is_rejected_and_completed() {
        let other = "https://www.ics.uci.edu/mirror";
        let body = "<html><body><p>same words on both pages</p></body></html>";
        let ctx = context(&[SEED, other], vec![page(SEED, body), page(other, body)]);
        let mut worker = worker(&ctx);

        let first = ctx.frontier.get_next_url().unwrap();
        assert!(matches!(
            worker.process_url(&first).unwrap(),
            Outcome::Processed { .. }
        ));

        let second = ctx.frontier.get_next_url().unwrap();
        assert_eq!(
            worker.process_url(&second).unwrap(),
            Outcome::Rejected(Rejection::DuplicateContent)
        );
        assert!(ctx.frontier.record(&second).unwrap().unwrap().completed);
    }

    #[test]
    fn test_duplicate_check_runs_before_size_check() {
        let other = "https://www.ics.uci.edu/mirror";
        let body = "x".repeat(MAX_CONTENT_SIZE as usize + 1);
        let ctx = context(&[SEED, other], vec![page(SEED, &body), page(other, &body)]);
        let mut worker = worker(&ctx);

        let first = ctx.frontier.get_next_url().unwrap();
        assert_eq!(
            worker.process_url(&first).unwrap(),
            Outcome::Rejected(Rejection::TooLarge(MAX_CONTENT_SIZE + 1))
        );

        let second = ctx.frontier.get_next_url().unwrap();
        assert_eq!(
            worker.process_url(&second).unwrap(),
            Outcome::Rejected(Rejection::DuplicateContent)
        );

        assert!(ctx.frontier.record(SEED).unwrap().unwrap().completed);
        assert!(ctx.frontier.record(other).unwrap().unwrap().completed);
    }

    #[test]
    fn test_reordered_tokens_are_near_duplicates() {
        let other = "https://www.ics.uci.edu/shuffled";
        let ctx = context(
            &[SEED, other],
            vec![
                page(SEED, "<html><body><p>alpha beta gamma</p></body></html>"),
                page(other, "<html><body><p>gamma beta alpha</p></body></html>"),
            ],
        );
        let mut worker = worker(&ctx);

        let first = ctx.frontier.get_next_url().unwrap();
        assert!(matches!(
            worker.process_url(&first).unwrap(),
            Outcome::Processed { .. }
        ));

        let second = ctx.frontier.get_next_url().unwrap();
        assert_eq!(
            worker.process_url(&second).unwrap(),
            Outcome::Rejected(Rejection::NearDuplicateContent)
        );
        assert!(ctx.frontier.record(&second).unwrap().unwrap().completed);
    }

    #[test]
    fn test_date_before_window_is_rejected() {
        let ctx = context(
            &[SEED],
            vec![page(SEED, "<html><body><p>Founded 1900-01-01</p></body></html>")],
        );
        let mut worker = worker(&ctx);

        let url = ctx.frontier.get_next_url().unwrap();
        assert_eq!(
            worker.process_url(&url).unwrap(),
            Outcome::Rejected(Rejection::DateOutOfRange(
                NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()
            ))
        );
        assert!(ctx.frontier.record(SEED).unwrap().unwrap().completed);
    }

    #[test]
    fn test_date_inside_window_is_processed() {
        let ctx = context(
            &[SEED],
            vec![page(SEED, "<html><body><p>Founded 1969-01-01</p></body></html>")],
        );
        let mut worker = worker(&ctx);

        let url = ctx.frontier.get_next_url().unwrap();
        assert_eq!(
            worker.process_url(&url).unwrap(),
            Outcome::Processed { links_added: 0 }
        );
    }

    #[test]
    fn test_unparseable_date_is_rejected() {
        let ctx = context(
            &[SEED],
            vec![page(SEED, "<html><body><p>Posted 2020-13-45</p></body></html>")],
        );
        let mut worker = worker(&ctx);

        let url = ctx.frontier.get_next_url().unwrap();
        assert_eq!(
            worker.process_url(&url).unwrap(),
            Outcome::Rejected(Rejection::InvalidDate("2020-13-45".to_string()))
        );
    }

    #[test]
    fn test_trap_pattern_is_rejected() {
        let trap = "https://www.ics.uci.edu/calendar/2020";
        let ctx = context(
            &[trap],
            vec![page(trap, "<html><body><p>events listing</p></body></html>")],
        );
        let mut worker = worker(&ctx);

        let url = ctx.frontier.get_next_url().unwrap();
        assert_eq!(
            worker.process_url(&url).unwrap(),
            Outcome::Rejected(Rejection::TrapPattern("/calendar/".to_string()))
        );
        assert!(ctx.frontier.record(trap).unwrap().unwrap().completed);
    }

    #[test]
    fn test_redirect_marks_requested_url_complete() {
        let moved = "https://www.ics.uci.edu/old";
        let target = "https://www.ics.uci.edu/new";
        let mut response = page(target, "<html><body><p>moved content here</p></body></html>");
        response.final_url = target.to_string();
        let ctx = context_with(&[moved], vec![(moved.to_string(), response)]);
        let mut worker = worker(&ctx);

        let url = ctx.frontier.get_next_url().unwrap();
        worker.process_url(&url).unwrap();

        assert!(ctx.frontier.record(moved).unwrap().unwrap().completed);
        assert!(ctx.stats.is_visited(target));
        assert!(!ctx.stats.is_visited(moved));
    }

    #[test]
    fn test_bad_status_yields_no_links() {
        let mut response = page(SEED, r#"<html><body><a href="/about">About</a></body></html>"#);
        response.status = 404;
        let ctx = context(&[SEED], vec![response]);
        let mut worker = worker(&ctx);

        let url = ctx.frontier.get_next_url().unwrap();
        assert_eq!(
            worker.process_url(&url).unwrap(),
            Outcome::Processed { links_added: 0 }
        );
        assert!(ctx.frontier.record(SEED).unwrap().unwrap().completed);
    }

    #[test]
    fn test_run_drains_frontier() {
        let ctx = context(
            &[SEED],
            vec![
                page(
                    SEED,
                    r#"<html><body><p>home page</p><a href="/a">A</a><a href="/b">B</a></body></html>"#,
                ),
                page(
                    "https://www.ics.uci.edu/a",
                    r#"<html><body><p>alpha page</p><a href="/">Home</a></body></html>"#,
                ),
                page(
                    "https://www.ics.uci.edu/b",
                    "<html><body><p>bravo page text</p></body></html>",
                ),
            ],
        );
        let mut worker = worker(&ctx);

        worker.run();

        assert_eq!(worker.state(), WorkerState::Stopped);
        assert!(ctx.frontier.is_empty());
        assert_eq!(ctx.frontier.ledger_len().unwrap(), 3);
        assert_eq!(ctx.stats.unique_pages(), 3);
    }

    #[test]
    fn test_stop_flag_checked_before_work() {
        let ctx = context(&[SEED], vec![page(SEED, "<html></html>")]);
        let mut worker = Worker::new(3, ctx.clone(), Arc::new(AtomicBool::new(true)));

        worker.run();

        assert_eq!(worker.state(), WorkerState::Stopped);
        assert_eq!(ctx.frontier.len(), 1);
        assert_eq!(worker.id(), 3);
    }

    #[test]
    fn test_is_redirect_ignores_normalization() {
        assert!(!is_redirect("https://www.ics.uci.edu/a", "https://www.ics.uci.edu/a/"));
        assert!(!is_redirect("https://www.ics.uci.edu/a", ""));
        assert!(is_redirect("https://www.ics.uci.edu/a", "https://www.ics.uci.edu/b"));
    }
}
