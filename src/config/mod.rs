//! Configuration module for Scholar-Crawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use scholar_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.ini")).unwrap();
//! println!("Crawler will use {} threads", config.crawler.threads);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, NetworkConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
