use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Scholar-Crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URLs the frontier is seeded with on a fresh crawl
    pub seeds: Vec<String>,

    /// Domain patterns (e.g., "*.ics.uci.edu") the crawl is restricted to
    #[serde(rename = "allowed-domains")]
    pub allowed_domains: Vec<String>,

    /// Number of worker threads
    pub threads: usize,

    /// Fixed delay each worker sleeps between URLs, also the per-domain
    /// politeness delay (seconds)
    #[serde(rename = "time-delay")]
    pub time_delay: f64,

    /// Path to the SQLite ledger file
    #[serde(rename = "ledger-path")]
    pub ledger_path: String,

    /// Hosts equal to or under this domain are counted in the subdomain statistics
    #[serde(rename = "subdomain-suffix", default = "default_subdomain_suffix")]
    pub subdomain_suffix: String,

    /// Seconds between periodic checkpoints
    #[serde(
        rename = "checkpoint-interval",
        default = "default_checkpoint_interval"
    )]
    pub checkpoint_interval: u64,
}

impl CrawlerConfig {
    /// The fixed per-worker delay as a `Duration`
    pub fn time_delay(&self) -> Duration {
        Duration::from_secs_f64(self.time_delay.max(0.0))
    }

    /// The checkpoint period as a `Duration`
    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval)
    }
}

fn default_subdomain_suffix() -> String {
    "ics.uci.edu".to_string()
}

fn default_checkpoint_interval() -> u64 {
    300
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Full user agent string sent with every request
    #[serde(default = "default_user_agent")]
    pub name: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives the checkpoint artifacts
    pub directory: String,
}

/// Network configuration consumed only by the downloader
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Optional cache server the downloader routes requests through
    #[serde(rename = "cache-server", default)]
    pub cache_server: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cache_server: None,
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
