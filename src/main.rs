//! Scholar-Crawl main entry point
//!
//! This is the command-line interface for the Scholar-Crawl academic crawler.

use clap::Parser;
use scholar_crawl::config::{load_config_with_hash, Config};
use scholar_crawl::crawler::Crawler;
use scholar_crawl::output::print_statistics;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tokio::runtime;
use tracing_subscriber::EnvFilter;

/// Scholar-Crawl: a polite, resumable academic web crawler
///
/// Scholar-Crawl crawls an allow-list of domains with a pool of worker
/// threads, keeps a durable ledger of every discovered URL so an
/// interrupted crawl picks up where it left off, and periodically
/// checkpoints page, word and subdomain statistics.
#[derive(Parser, Debug)]
#[command(name = "scholar-crawl")]
#[command(version)]
#[command(about = "A polite, resumable academic web crawler", long_about = None)]
struct Cli {
    /// Delete the ledger and start again from the seed URLs
    #[arg(long)]
    restart: bool,

    /// Path to the TOML configuration file
    #[arg(long = "config_file", value_name = "PATH", default_value = "config.ini")]
    config_file: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config_file.display());
    let config = match load_config_with_hash(&cli.config_file) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match handle_crawl(config, cli.restart) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("scholar_crawl=info,warn"),
            1 => EnvFilter::new("scholar_crawl=debug,info"),
            2 => EnvFilter::new("scholar_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .init();
}

/// Handles the main crawl operation
///
/// The tokio runtime only drives HTTP requests and the signal listener; the
/// crawl itself runs on this thread and the worker threads it spawns.
fn handle_crawl(config: Config, restart: bool) -> Result<(), Box<dyn std::error::Error>> {
    if restart {
        tracing::info!("Starting fresh crawl (ledger will be deleted)");
    } else {
        tracing::info!("Starting crawl (will resume from the ledger if present)");
    }
    tracing::info!(
        "Seeds: {}, allowed domains: {}, threads: {}",
        config.crawler.seeds.len(),
        config.crawler.allowed_domains.len(),
        config.crawler.threads
    );

    let runtime = runtime::Builder::new_multi_thread().enable_all().build()?;
    let crawler = {
        let _guard = runtime.enter();
        Crawler::new(&config, restart, runtime.handle().clone())?
    };

    let stop = crawler.stop_handle();
    runtime.spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("Shutdown requested, finishing in-flight pages");
        stop.store(true, Ordering::SeqCst);
    });

    let snapshot = crawler.run()?;
    runtime.shutdown_background();

    tracing::info!("Crawl completed successfully");
    print_statistics(&snapshot);
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM: {}", e);
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    wait_for_ctrl_c().await
}

/// Resolves on SIGINT, never if the listener cannot be installed
async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for SIGINT: {}", e);
        std::future::pending::<()>().await;
    }
}
