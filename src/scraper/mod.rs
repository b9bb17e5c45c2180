//! Scraper module for fetching HTML content from the target URL
//!
//! This module provides the [`PageFetcher`] abstraction and its two
//! strategies: a static HTTP fetcher with browser-like headers, and (with the
//! `browser` feature) a headless Chromium renderer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Config, FetchStrategy};

#[cfg(feature = "browser")]
pub mod browser;

/// Errors that can occur during scraping operations
#[derive(Error, Debug)]
pub enum ScraperError {
    /// Network-related errors (connection timeout, DNS failure, etc.)
    #[error("Failed to connect to server: {0}")]
    NetworkError(String),

    /// HTTP non-2xx status code errors
    #[error("Server returned status {0}")]
    HttpError(u16),

    /// Error reading response body
    #[error("Failed to read response body: {0}")]
    ResponseError(String),

    /// Browser could not be started or configured
    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    /// Browser navigation or page evaluation failed
    #[error("Browser navigation failed: {0}")]
    Navigation(String),

    /// Navigation did not finish in time
    #[error("Navigation timed out after {0}s")]
    NavigationTimeout(u64),
}

/// Source of page markup for a URL
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the HTML for `url`
    async fn fetch_html(&self, url: &str) -> Result<String, ScraperError>;
}

/// List of realistic user agents for rotation
const USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    // Chrome on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    // Edge on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Pick a user agent, rotating when enabled
fn pick_user_agent(rotate: bool) -> &'static str {
    if rotate {
        let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
        USER_AGENTS[idx]
    } else {
        USER_AGENTS[0]
    }
}

/// Client-hint headers that match the user agent
fn sec_ch_ua(user_agent: &str) -> Option<(&'static str, &'static str)> {
    if user_agent.contains("Edg/") {
        Some((
            "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Microsoft Edge\";v=\"120\"",
            "\"Windows\"",
        ))
    } else if user_agent.contains("Macintosh") && user_agent.contains("Chrome/") {
        Some((
            "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"",
            "\"macOS\"",
        ))
    } else if user_agent.contains("Chrome/120") {
        Some((
            "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"",
            "\"Windows\"",
        ))
    } else if user_agent.contains("Chrome/119") {
        Some((
            "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"119\", \"Google Chrome\";v=\"119\"",
            "\"Windows\"",
        ))
    } else {
        // Firefox doesn't send client hints
        None
    }
}

/// HTTP fetcher that spoofs a desktop browser and never runs scripts
pub struct StaticFetcher {
    client: Client,
    rotate_user_agent: bool,
}

impl StaticFetcher {
    /// Create a fetcher with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ScraperError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            rotate_user_agent: true,
        })
    }

    /// Always send the first user agent instead of rotating
    pub fn with_fixed_user_agent(mut self) -> Self {
        self.rotate_user_agent = false;
        self
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        let user_agent = pick_user_agent(self.rotate_user_agent);

        let mut request = self
            .client
            .get(url)
            .header("User-Agent", user_agent)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9,id;q=0.8")
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header("Sec-Fetch-User", "?1")
            .header("Upgrade-Insecure-Requests", "1");

        if let Some((brands, platform)) = sec_ch_ua(user_agent) {
            request = request
                .header("Sec-Ch-Ua", brands)
                .header("Sec-Ch-Ua-Mobile", "?0")
                .header("Sec-Ch-Ua-Platform", platform);
        }

        debug!("GET {}", url);
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ScraperError::NetworkError("Connection timeout".to_string())
            } else if e.is_connect() {
                ScraperError::NetworkError("Failed to connect to server".to_string())
            } else {
                ScraperError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::HttpError(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ScraperError::ResponseError(e.to_string()))
    }
}

/// Build the fetcher selected by configuration
pub fn build_fetcher(config: &Config) -> Result<Arc<dyn PageFetcher>, ScraperError> {
    let timeout = Duration::from_secs(config.navigation_timeout_secs);
    match config.fetch_strategy {
        FetchStrategy::Static => {
            info!("Using static HTML fetcher");
            Ok(Arc::new(StaticFetcher::new(timeout)?))
        }
        #[cfg(feature = "browser")]
        FetchStrategy::Browser => {
            let executable = config
                .resolve_chrome_executable()
                .map_err(|e| ScraperError::BrowserLaunch(e.to_string()))?;
            info!("Using headless browser at {}", executable.display());
            Ok(Arc::new(browser::BrowserFetcher::new(browser::BrowserOptions {
                executable,
                block_subresources: config.block_subresources,
                timeout,
            })))
        }
        #[cfg(not(feature = "browser"))]
        FetchStrategy::Browser => Err(ScraperError::BrowserLaunch(
            "this build was compiled without the `browser` feature".to_string(),
        )),
    }
}
