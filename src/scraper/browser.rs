//! Headless browser fetcher.
//!
//! Each fetch launches its own Chromium process through chromiumoxide (CDP),
//! renders the page and returns the resulting DOM once the network has gone
//! quiet (at most two requests in flight for 500 ms). The process is owned by
//! a [`BrowserSession`] which is closed whether rendering succeeds or fails.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, ResourceType,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{PageFetcher, ScraperError};

/// Sub-resource types aborted when blocking is enabled
const BLOCKED_RESOURCES: &[ResourceType] = &[
    ResourceType::Image,
    ResourceType::Stylesheet,
    ResourceType::Font,
    ResourceType::Script,
];

/// Requests still allowed in flight when the network counts as quiet
const IDLE_MAX_INFLIGHT: usize = 2;
/// How long the network must stay quiet
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Options for launching a browser session
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Chrome/Chromium executable
    pub executable: PathBuf,
    /// Abort image, stylesheet, font and script loads
    pub block_subresources: bool,
    /// Navigation timeout
    pub timeout: Duration,
}

/// Whether a request of this type is aborted during rendering
pub fn is_blocked(resource_type: &ResourceType) -> bool {
    BLOCKED_RESOURCES.contains(resource_type)
}

/// A request starting or ending on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkSignal {
    Started,
    Settled,
}

/// Count of requests in flight, used to detect a quiet network.
#[derive(Debug, Default)]
pub struct InflightRequests(usize);

impl InflightRequests {
    pub fn record(&mut self, signal: NetworkSignal) {
        match signal {
            NetworkSignal::Started => self.0 += 1,
            // requests started before the listeners were attached
            NetworkSignal::Settled => self.0 = self.0.saturating_sub(1),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.0 <= IDLE_MAX_INFLIGHT
    }
}

/// Subscribe to request start/finish events of `page`.
async fn network_signals(page: &Page) -> Result<BoxStream<'static, NetworkSignal>, ScraperError> {
    let listen_err = |e: chromiumoxide::error::CdpError| ScraperError::Navigation(e.to_string());
    let started = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(listen_err)?
        .map(|_| NetworkSignal::Started);
    let finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(listen_err)?
        .map(|_| NetworkSignal::Settled);
    let failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(listen_err)?
        .map(|_| NetworkSignal::Settled);
    Ok(stream::select(started, stream::select(finished, failed)).boxed())
}

/// Wait until no more than two requests have been in flight for half a second.
async fn wait_for_network_idle(signals: &mut BoxStream<'static, NetworkSignal>) {
    let mut inflight = InflightRequests::default();
    loop {
        match tokio::time::timeout(IDLE_WINDOW, signals.next()).await {
            Ok(Some(signal)) => inflight.record(signal),
            Ok(None) => break,
            Err(_) if inflight.is_idle() => break,
            Err(_) => {}
        }
    }
}

/// A launched browser process plus its CDP event loop.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch an isolated headless browser.
    pub async fn launch(options: &BrowserOptions) -> Result<Self, ScraperError> {
        let config = BrowserConfig::builder()
            .chrome_executable(&options.executable)
            .request_timeout(options.timeout)
            .arg("--hide-scrollbars")
            .arg("--disable-web-security")
            .arg("--ignore-certificate-errors")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .build()
            .map_err(ScraperError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Navigate to `url` and return the rendered markup.
    pub async fn render(
        &self,
        url: &str,
        options: &BrowserOptions,
    ) -> Result<String, ScraperError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;

        let interceptor = if options.block_subresources {
            Some(intercept_subresources(&page).await?)
        } else {
            None
        };

        let mut signals = network_signals(&page).await?;

        info!("Navigating to {}", url);
        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            wait_for_network_idle(&mut signals).await;
            page.content().await
        };

        let outcome = tokio::time::timeout(options.timeout, navigation).await;

        if let Some(task) = interceptor {
            task.abort();
        }
        if let Err(e) = page.close().await {
            debug!("Page close failed: {}", e);
        }

        match outcome {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(e)) => Err(ScraperError::Navigation(e.to_string())),
            Err(_) => Err(ScraperError::NavigationTimeout(options.timeout.as_secs())),
        }
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Browser process wait failed: {}", e);
        }
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Pause every request and abort the blocked sub-resource kinds.
async fn intercept_subresources(page: &Page) -> Result<JoinHandle<()>, ScraperError> {
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|e| ScraperError::Navigation(e.to_string()))?;

    let intercept_page = page.clone();
    let task = tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let result = if is_blocked(&event.resource_type) {
                intercept_page
                    .execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
            } else {
                intercept_page
                    .execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ())
            };
            if let Err(e) = result {
                debug!("Interception for {} failed: {}", event.request.url, e);
            }
        }
    });

    page.execute(
        EnableParams::builder()
            .pattern(RequestPattern::builder().url_pattern("*").build())
            .build(),
    )
    .await
    .map_err(|e| ScraperError::Navigation(e.to_string()))?;

    Ok(task)
}

/// Fetcher that renders every page in a fresh browser session
pub struct BrowserFetcher {
    options: BrowserOptions,
}

impl BrowserFetcher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        let session = BrowserSession::launch(&self.options).await?;
        let rendered = session.render(url, &self.options).await;
        session.close().await;
        rendered
    }
}
