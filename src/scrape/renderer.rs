// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Headless Chromium fetcher
//!
//! The browser is launched on the first rendered fetch and shared by all
//! later ones; if it exits, the next rendered fetch relaunches it. Each fetch opens its own tab; the tab is closed on every exit
//! path, including when the fetch future is dropped mid-navigation.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventResponseReceived, ResourceType,
};
use chromiumoxide::page::Page;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::fetcher::{FetchError, PageFetcher};
use super::safety::UrlSafetyPolicy;
use super::types::RawPage;

/// Do not retry a failed browser launch more often than this
const RELAUNCH_BACKOFF: Duration = Duration::from_secs(60);

/// How long to wait for the buffered main-document response event after navigation
const DOCUMENT_EVENT_WAIT: Duration = Duration::from_millis(500);

/// Rendered fetcher settings
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Chromium binary; chromiumoxide auto-detects when `None`
    pub chrome_path: Option<PathBuf>,
    /// Upper bound for a single navigation
    pub navigation_timeout: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            navigation_timeout: Duration::from_secs(20),
        }
    }
}

/// A launched browser plus a flag cleared when its event loop ends
struct LiveBrowser<B> {
    browser: Arc<B>,
    alive: Arc<AtomicBool>,
}

impl<B> Clone for LiveBrowser<B> {
    fn clone(&self) -> Self {
        Self {
            browser: Arc::clone(&self.browser),
            alive: Arc::clone(&self.alive),
        }
    }
}

impl<B> LiveBrowser<B> {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Holds the shared browser
///
/// A browser whose event loop has ended is dropped and relaunched on the
/// next request. After a failed launch, requests fail fast until `backoff`
/// has passed.
struct BrowserSlot<B> {
    current: tokio::sync::Mutex<Option<LiveBrowser<B>>>,
    last_launch_failure: Mutex<Option<Instant>>,
    backoff: Duration,
}

impl<B> BrowserSlot<B> {
    fn new(backoff: Duration) -> Self {
        Self {
            current: tokio::sync::Mutex::new(None),
            last_launch_failure: Mutex::new(None),
            backoff,
        }
    }

    async fn get_or_launch<F, Fut>(&self, launch: F) -> Result<LiveBrowser<B>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(B, Arc<AtomicBool>), FetchError>>,
    {
        let mut current = self.current.lock().await;
        if let Some(live) = current.as_ref() {
            if live.is_alive() {
                return Ok(live.clone());
            }
            warn!("Headless browser is gone, relaunching");
            *current = None;
        }

        {
            let last = self
                .last_launch_failure
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(at) = *last {
                if at.elapsed() < self.backoff {
                    return Err(FetchError::RendererUnavailable(
                        "browser launch failed recently".to_string(),
                    ));
                }
            }
        }

        match launch().await {
            Ok((browser, alive)) => {
                let live = LiveBrowser {
                    browser: Arc::new(browser),
                    alive,
                };
                *current = Some(live.clone());
                *self
                    .last_launch_failure
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
                Ok(live)
            }
            Err(e) => {
                warn!("Headless browser unavailable: {}", e);
                *self
                    .last_launch_failure
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());
                Err(e)
            }
        }
    }

    /// Forget the current browser; the next request relaunches
    async fn invalidate(&self) {
        if let Some(live) = self.current.lock().await.take() {
            live.alive.store(false, Ordering::SeqCst);
        }
    }

    async fn is_live(&self) -> bool {
        self.current
            .lock()
            .await
            .as_ref()
            .is_some_and(|live| live.is_alive())
    }
}

/// Status and MIME type of the main document response
#[derive(Debug, Clone, PartialEq, Eq)]
struct DocumentResponse {
    status: u16,
    mime_type: String,
}

fn document_response(
    resource: &ResourceType,
    status: i64,
    mime_type: &str,
) -> Option<DocumentResponse> {
    if !matches!(resource, ResourceType::Document) {
        return None;
    }
    Some(DocumentResponse {
        status: u16::try_from(status).unwrap_or(0),
        mime_type: mime_type.to_string(),
    })
}

/// First document response in the stream; redirects do not emit one
async fn first_document_response<S>(events: &mut S) -> Option<DocumentResponse>
where
    S: Stream<Item = Arc<EventResponseReceived>> + Unpin,
{
    let scan = async {
        while let Some(event) = events.next().await {
            if let Some(document) = document_response(
                &event.r#type,
                event.response.status,
                &event.response.mime_type,
            ) {
                return Some(document);
            }
        }
        None
    };
    tokio::time::timeout(DOCUMENT_EVENT_WAIT, scan)
        .await
        .ok()
        .flatten()
}

fn rendered_page(
    url: &str,
    final_url: Option<String>,
    body: String,
    document: Option<DocumentResponse>,
) -> RawPage {
    let (status, content_type) = match document {
        Some(document) => (document.status, Some(document.mime_type)),
        None => {
            // Served without a network response (cache, service worker)
            debug!("No document response seen for {}, assuming 200", url);
            (200, None)
        }
    };
    RawPage {
        requested_url: url.to_string(),
        final_url: final_url.unwrap_or_else(|| url.to_string()),
        status,
        content_type,
        body,
    }
}

/// Fetches pages through a shared headless Chromium
pub struct ChromiumFetcher {
    config: RendererConfig,
    safety: UrlSafetyPolicy,
    slot: BrowserSlot<Browser>,
    active_tabs: Arc<AtomicUsize>,
}

impl ChromiumFetcher {
    pub fn new(config: RendererConfig, safety: UrlSafetyPolicy) -> Self {
        Self {
            config,
            safety,
            slot: BrowserSlot::new(RELAUNCH_BACKOFF),
            active_tabs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Tabs currently open
    pub fn active_tabs(&self) -> usize {
        self.active_tabs.load(Ordering::Relaxed)
    }

    /// Whether a running browser is held
    pub async fn is_launched(&self) -> bool {
        self.slot.is_live().await
    }

    /// Browser-side failures are the renderer's problem, not the site's
    fn render_error(live: &LiveBrowser<Browser>, err: FetchError) -> FetchError {
        if live.is_alive() {
            err
        } else {
            FetchError::RendererUnavailable(format!("browser exited: {}", err))
        }
    }

    async fn render(
        &self,
        live: &LiveBrowser<Browser>,
        tab: &TabGuard,
        url: &str,
    ) -> Result<RawPage, FetchError> {
        let page = tab.page()?;
        let timeout = self.config.navigation_timeout;

        if let Err(e) = page.execute(EnableParams::default()).await {
            debug!("Failed to enable Network domain for {}: {}", url, e);
        }
        let mut responses = match page.event_listener::<EventResponseReceived>().await {
            Ok(events) => Some(events),
            Err(e) => {
                debug!("No response events for {}: {}", url, e);
                None
            }
        };

        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(Self::render_error(
                    live,
                    FetchError::Transport(format!("navigation failed: {}", e)),
                ))
            }
            Err(_) => return Err(FetchError::Timeout(url.to_string())),
        }

        let document = match responses.as_mut() {
            Some(events) => first_document_response(events).await,
            None => None,
        };

        let body = page.content().await.map_err(|e| {
            Self::render_error(
                live,
                FetchError::Transport(format!("failed to read page content: {}", e)),
            )
        })?;
        let final_url = page.url().await.ok().flatten();

        Ok(rendered_page(url, final_url, body, document))
    }
}

async fn launch_browser(config: &RendererConfig) -> Result<(Browser, Arc<AtomicBool>), FetchError> {
    let mut builder = BrowserConfig::builder()
        .arg("--headless=new")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--blink-settings=imagesEnabled=false");
    if let Some(path) = &config.chrome_path {
        builder = builder.chrome_executable(path);
    }
    let browser_config = builder
        .build()
        .map_err(|e| FetchError::RendererUnavailable(format!("browser config: {}", e)))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| FetchError::RendererUnavailable(format!("failed to launch Chromium: {}", e)))?;

    let alive = Arc::new(AtomicBool::new(true));
    let handler_alive = Arc::clone(&alive);
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("Chromium handler event error: {}", e);
            }
        }
        handler_alive.store(false, Ordering::SeqCst);
        warn!("Chromium connection closed");
    });

    info!("Headless Chromium launched");
    Ok((browser, alive))
}

/// An open tab, closed when the guard goes away
struct TabGuard {
    page: Option<Page>,
    active_tabs: Arc<AtomicUsize>,
}

impl TabGuard {
    fn new(page: Page, active_tabs: Arc<AtomicUsize>) -> Self {
        active_tabs.fetch_add(1, Ordering::Relaxed);
        Self {
            page: Some(page),
            active_tabs,
        }
    }

    fn page(&self) -> Result<&Page, FetchError> {
        self.page
            .as_ref()
            .ok_or_else(|| FetchError::Transport("tab already closed".to_string()))
    }

    async fn close(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Failed to close tab: {}", e);
            }
        }
    }
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        self.active_tabs.fetch_sub(1, Ordering::Relaxed);
        // Dropped without an explicit close (cancellation): close in the background
        if let Some(page) = self.page.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = page.close().await;
                });
            }
        }
    }
}

#[async_trait]
impl PageFetcher for ChromiumFetcher {
    async fn fetch(&self, url: &str) -> Result<RawPage, FetchError> {
        self.safety
            .check_resolved(url)
            .await
            .map_err(|e| FetchError::UnsafeUrl(format!("{}: {}", url, e)))?;

        let live = self
            .slot
            .get_or_launch(|| launch_browser(&self.config))
            .await?;

        debug!("Fetching (rendered): {}", url);

        let page = match live.browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                // A browser that cannot open a tab is unusable
                self.slot.invalidate().await;
                return Err(FetchError::RendererUnavailable(format!(
                    "failed to open tab: {}",
                    e
                )));
            }
        };
        let tab = TabGuard::new(page, Arc::clone(&self.active_tabs));

        let result = self.render(&live, &tab, url).await;
        tab.close().await;
        result
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}
