//! Crawler coordinator - main crawl orchestration logic
//!
//! This module wires the shared components together and runs the crawl:
//! - Opening (or resuming) the frontier over the ledger
//! - Spawning the pool of worker threads
//! - Flushing checkpoints on a timer thread
//! - Writing a final checkpoint once the workers are done

use crate::config::Config;
use crate::crawler::dedup::DedupEngine;
use crate::crawler::fetcher::{Downloader, HttpDownloader};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::{ContentExtractor, HtmlExtractor};
use crate::crawler::politeness::PolitenessController;
use crate::crawler::worker::{CrawlContext, Worker};
use crate::output::{AggregationStore, Checkpoint, StatsSnapshot};
use crate::url::{ScopeValidator, UrlValidator};
use crate::{CrawlError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{error, info, warn};

/// Main crawler structure
pub struct Crawler {
    ctx: Arc<CrawlContext>,
    checkpoint: Checkpoint,
    threads: usize,
    checkpoint_interval: Duration,
    stop: Arc<AtomicBool>,
}

impl Crawler {
    /// Creates a crawler using the HTTP downloader, HTML extractor and scope
    /// validator built from `config`
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `restart` - Delete any existing ledger and start from the seeds
    /// * `handle` - Runtime the downloader drives its requests on
    pub fn new(config: &Config, restart: bool, handle: Handle) -> Result<Self> {
        let downloader = HttpDownloader::from_config(&config.user_agent, &config.network, handle)?;
        let validator = ScopeValidator::new(config.crawler.allowed_domains.clone());

        Self::with_collaborators(
            config,
            restart,
            Arc::new(downloader),
            Arc::new(HtmlExtractor::new()),
            Arc::new(validator),
        )
    }

    /// Creates a crawler with caller-supplied collaborators
    ///
    /// Only startup failures are returned here: an unreadable ledger or an
    /// output directory that cannot be created.
    pub fn with_collaborators(
        config: &Config,
        restart: bool,
        downloader: Arc<dyn Downloader>,
        extractor: Arc<dyn ContentExtractor>,
        validator: Arc<dyn UrlValidator>,
    ) -> Result<Self> {
        let frontier = Frontier::open(&config.crawler, restart, validator.as_ref())?;
        let checkpoint = Checkpoint::new(&config.output.directory)?;
        let delay = config.crawler.time_delay();

        let ctx = CrawlContext {
            frontier,
            politeness: PolitenessController::new(delay),
            dedup: DedupEngine::new(),
            stats: AggregationStore::new(&config.crawler.subdomain_suffix),
            downloader,
            extractor,
            validator,
            delay,
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            checkpoint,
            threads: config.crawler.threads.max(1),
            checkpoint_interval: config.crawler.checkpoint_interval(),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that makes every worker stop after its current URL
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Requests a graceful stop
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn frontier(&self) -> &Frontier {
        &self.ctx.frontier
    }

    pub fn stats(&self) -> &AggregationStore {
        &self.ctx.stats
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Runs the crawl until the frontier drains or a stop is requested
    ///
    /// Blocks the calling thread. The returned snapshot is the one written by
    /// the final checkpoint.
    pub fn run(&self) -> Result<StatsSnapshot> {
        info!(
            threads = self.threads,
            pending = self.ctx.frontier.len(),
            "Starting crawl"
        );
        let start_time = Instant::now();

        let (tx_stop, rx_stop) = crossbeam_channel::unbounded::<()>();
        let timer = self.spawn_checkpoint_timer(rx_stop)?;

        let mut workers = Vec::with_capacity(self.threads);
        for id in 0..self.threads {
            let ctx = self.ctx.clone();
            let stop = self.stop.clone();
            let worker = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || Worker::new(id, ctx, stop).run())?;
            workers.push(worker);
        }

        let mut panicked = None;
        for (id, worker) in workers.into_iter().enumerate() {
            if worker.join().is_err() {
                error!(worker = id, "Worker panicked");
                panicked.get_or_insert(id);
            }
        }

        // Either a send or a disconnect wakes the timer up
        let _ = tx_stop.send(());
        if timer.join().is_err() {
            error!("Checkpoint thread panicked");
        }

        if let Err(e) = self.checkpoint.flush(&self.ctx.stats) {
            error!("Final checkpoint incomplete: {}", e);
        }

        let snapshot = self.ctx.stats.snapshot();
        info!(
            unique_pages = snapshot.unique_pages,
            pending = self.ctx.frontier.len(),
            "Crawl finished in {:?}",
            start_time.elapsed()
        );

        match panicked {
            Some(id) => Err(CrawlError::WorkerPanicked(id)),
            None => Ok(snapshot),
        }
    }

    fn spawn_checkpoint_timer(&self, rx_stop: Receiver<()>) -> Result<thread::JoinHandle<()>> {
        let ctx = self.ctx.clone();
        let checkpoint = self.checkpoint.clone();
        let interval = self.checkpoint_interval;

        let timer = thread::Builder::new()
            .name("checkpoint".to_string())
            .spawn(move || loop {
                if let Err(e) = checkpoint.flush(&ctx.stats) {
                    warn!("Checkpoint incomplete: {}", e);
                }
                match rx_stop.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(timer)
    }
}
