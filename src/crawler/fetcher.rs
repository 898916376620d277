//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - Routing requests through an optional cache server
//! - Following redirects and reporting the final URL
//! - Capping how much of an oversized body is read
//! - Bridging the async client into the blocking worker threads

use crate::config::{NetworkConfig, UserAgentConfig};
use crate::crawler::filter::MAX_CONTENT_SIZE;
use anyhow::Context;
use reqwest::{redirect::Policy, Client, Proxy};
use std::collections::HashMap;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// A downloaded page as handed to the filter pipeline and extractor
#[derive(Debug, Clone, Default)]
pub struct PageResponse {
    /// HTTP status code
    pub status: u16,
    /// URL the content was finally served from, after redirects
    pub final_url: String,
    /// Raw body bytes
    pub content: Vec<u8>,
    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
}

impl PageResponse {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns true for statuses the extractor reads content from (200..400)
    pub fn is_usable(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Fetches pages on behalf of the workers
pub trait Downloader: Send + Sync {
    /// Downloads `url`, returning `None` when no response could be obtained
    fn download(&self, url: &str) -> Option<PageResponse>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use scholar_crawl::config::{NetworkConfig, UserAgentConfig};
/// use scholar_crawl::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &NetworkConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    network: &NetworkConfig,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent.name.clone())
        .timeout(Duration::from_secs(network.timeout))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true);

    if let Some(cache_server) = &network.cache_server {
        builder = builder.proxy(Proxy::all(cache_server.as_str())?);
    }

    builder.build()
}

/// Downloader backed by an async reqwest client
///
/// Workers are plain OS threads, so each download is driven to completion on
/// the shared tokio runtime through its handle.
pub struct HttpDownloader {
    client: Client,
    handle: Handle,
}

impl HttpDownloader {
    pub fn new(client: Client, handle: Handle) -> Self {
        Self { client, handle }
    }

    /// Builds the client from configuration
    pub fn from_config(
        user_agent: &UserAgentConfig,
        network: &NetworkConfig,
        handle: Handle,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent, network)?, handle))
    }

    async fn fetch(&self, url: &str) -> anyhow::Result<PageResponse> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        // Bodies past the size limit are cut one byte over it, enough for
        // the size check to reject them without holding the rest in memory
        let limit = MAX_CONTENT_SIZE as usize + 1;
        let mut content = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("failed to read body of {}", url))?
        {
            content.extend_from_slice(&chunk);
            if content.len() >= limit {
                content.truncate(limit);
                debug!(url, "Body exceeds size limit, stopped reading");
                break;
            }
        }

        debug!(url, status, bytes = content.len(), "Fetched");

        Ok(PageResponse {
            status,
            final_url,
            content,
            headers,
        })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str) -> Option<PageResponse> {
        match self.handle.block_on(self.fetch(url)) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("Download failed: {:#}", e);
                None
            }
        }
    }
}
