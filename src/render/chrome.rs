//! Chromium renderer built on chromiumoxide
//!
//! One browser process is shared by all workers. Each session runs in its own
//! CDP browser context, so cookies and storage never leak between visits, and
//! the context is disposed when the session closes.

use super::{FrameDocument, RenderError, RenderSession, Renderer};
use crate::config::{CrawlConfig, WaitUntil};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::{
    EventResponseReceived, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, EventConsoleApiCalled, EventExceptionThrown,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Interval between polls while waiting on page state
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Quiet window after which the network counts as idle
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// HTTP status of the main document, when the browser exposes it
const NAVIGATION_STATUS_SCRIPT: &str = r#"
(() => {
    const entry = performance.getEntriesByType('navigation')[0];
    return entry && entry.responseStatus ? entry.responseStatus : null;
})()
"#;

/// Number of resources fetched so far, used to detect network quiescence
const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

/// Serialized documents of same-origin frames (cross-origin frames are opaque)
const FRAMES_SCRIPT: &str = r#"
(() => Array.from(document.querySelectorAll('iframe, frame'))
    .map(frame => {
        try {
            const doc = frame.contentDocument;
            if (!doc || !doc.documentElement) return null;
            return { url: doc.location.href, html: doc.documentElement.outerHTML };
        } catch (e) {
            return null;
        }
    })
    .filter(Boolean))()
"#;

/// Launch settings for the shared browser
#[derive(Debug, Clone, Default)]
pub struct ChromeOptions {
    pub headless: bool,
    pub user_agent: Option<String>,
    pub chrome_executable: Option<PathBuf>,
    pub log_console: bool,
    pub log_network: bool,
}

impl ChromeOptions {
    /// Derives browser options from the crawl configuration
    ///
    /// `CHROMIUM_PATH` overrides executable discovery when the configuration
    /// does not name one.
    pub fn from_config(config: &CrawlConfig) -> Self {
        let chrome_executable = config
            .chrome_executable
            .clone()
            .or_else(|| std::env::var_os("CHROMIUM_PATH").map(PathBuf::from));

        Self {
            headless: config.headless,
            user_agent: config.user_agent.clone(),
            chrome_executable,
            log_console: config.log_console,
            log_network: config.log_network,
        }
    }
}

/// Renderer backed by a single headless (or headed) Chromium process
pub struct ChromeRenderer {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
    options: ChromeOptions,
}

impl ChromeRenderer {
    /// Launches the browser and starts its CDP event handler
    pub async fn launch(options: ChromeOptions) -> Result<Self, RenderError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_secs(30))
            .window_size(1920, 1080)
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");

        if !options.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &options.chrome_executable {
            tracing::info!("Using browser executable: {}", path.display());
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler event error: {}", e);
                }
            }
            tracing::debug!("Browser handler task completed");
        });

        tracing::info!(
            "Browser launched ({})",
            if options.headless { "headless" } else { "headed" }
        );

        Ok(Self {
            browser: Arc::new(browser),
            handler,
            options,
        })
    }

    /// Closes the browser process
    ///
    /// Every session must have been closed first; otherwise the process is
    /// left to exit when its handle drops.
    pub async fn shutdown(self) {
        match Arc::try_unwrap(self.browser) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    tracing::warn!("Browser close error: {}", e);
                }
                if let Err(e) = browser.wait().await {
                    tracing::warn!("Browser wait error: {}", e);
                }
            }
            Err(_) => tracing::warn!("Browser still shared at shutdown, skipping close"),
        }
        self.handler.abort();
    }

    async fn dispose_context(&self, context_id: BrowserContextId) {
        if let Err(e) = self
            .browser
            .execute(DisposeBrowserContextParams::new(context_id))
            .await
        {
            tracing::debug!("Failed to dispose browser context: {}", e);
        }
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let context_id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(protocol_error)?
            .result
            .browser_context_id;

        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = Some(context_id.clone());

        let page = match self.browser.new_page(target).await {
            Ok(page) => page,
            Err(e) => {
                self.dispose_context(context_id).await;
                return Err(protocol_error(e));
            }
        };

        if let Some(agent) = &self.options.user_agent {
            let params = SetUserAgentOverrideParams::new(agent.clone());
            if let Err(e) = page.set_user_agent(params).await {
                tracing::warn!("Failed to set user agent: {}", e);
            }
        }

        let listeners = spawn_page_loggers(&page, &self.options).await;

        Ok(Box::new(ChromeSession {
            browser: Arc::clone(&self.browser),
            context_id,
            page,
            listeners,
        }))
    }
}

/// A page inside its own browser context
struct ChromeSession {
    browser: Arc<Browser>,
    context_id: BrowserContextId,
    page: Page,
    listeners: Vec<JoinHandle<()>>,
}

impl ChromeSession {
    async fn eval(&self, script: &str) -> Result<Value, RenderError> {
        let result = self.page.evaluate(script).await.map_err(protocol_error)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    /// Waits until the resource count stops changing for a quiet window
    async fn wait_for_network_idle(&self, budget: Duration) -> Result<(), RenderError> {
        let started = Instant::now();
        let mut last_count = None;
        let mut quiet_since = Instant::now();

        loop {
            let count = self.eval(RESOURCE_COUNT_SCRIPT).await?.as_u64();
            if count != last_count {
                last_count = count;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= NETWORK_IDLE_WINDOW {
                return Ok(());
            }

            if started.elapsed() >= budget {
                return Err(RenderError::timeout("network idle", budget));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn navigate(
        &mut self,
        url: &str,
        budget: Duration,
        until: WaitUntil,
    ) -> Result<Option<u16>, RenderError> {
        let started = Instant::now();

        // goto resolves once the load event fired, so DomContentLoaded waits for load too.
        tokio::time::timeout(budget, self.page.goto(url))
            .await
            .map_err(|_| RenderError::timeout("navigation", budget))?
            .map_err(|e| match e {
                CdpError::Timeout => RenderError::timeout("navigation", budget),
                other => RenderError::Navigation(other.to_string()),
            })?;

        if until.needs_network_idle() {
            let remaining = budget.saturating_sub(started.elapsed());
            self.wait_for_network_idle(remaining).await?;
        }

        let status = self.eval(NAVIGATION_STATUS_SCRIPT).await?;
        Ok(status.as_u64().and_then(|s| u16::try_from(s).ok()))
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        budget: Duration,
    ) -> Result<(), RenderError> {
        let started = Instant::now();
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if started.elapsed() >= budget {
                return Err(RenderError::timeout("selector wait", budget));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_function(
        &mut self,
        predicate: &str,
        budget: Duration,
    ) -> Result<(), RenderError> {
        let started = Instant::now();
        let script = format!("Boolean({})", predicate);
        loop {
            if self.eval(&script).await?.as_bool() == Some(true) {
                return Ok(());
            }
            if started.elapsed() >= budget {
                return Err(RenderError::timeout("function wait", budget));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, RenderError> {
        self.eval(script).await
    }

    async fn title(&mut self) -> Result<Option<String>, RenderError> {
        self.page.get_title().await.map_err(protocol_error)
    }

    async fn current_url(&mut self) -> Result<Option<String>, RenderError> {
        self.page.url().await.map_err(protocol_error)
    }

    async fn rendered_html(&mut self) -> Result<String, RenderError> {
        self.page.content().await.map_err(protocol_error)
    }

    async fn frames(&mut self) -> Result<Vec<FrameDocument>, RenderError> {
        let value = self.eval(FRAMES_SCRIPT).await?;
        let frames = value
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        Some(FrameDocument {
                            url: entry.get("url")?.as_str()?.to_string(),
                            html: entry.get("html")?.as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(frames)
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), RenderError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await
            .map_err(protocol_error)?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        let ChromeSession {
            browser,
            context_id,
            page,
            listeners,
        } = *self;

        for listener in listeners {
            listener.abort();
        }

        let closed = page.close().await.map_err(protocol_error);
        let disposed = browser
            .execute(DisposeBrowserContextParams::new(context_id))
            .await
            .map(|_| ())
            .map_err(protocol_error);

        closed.and(disposed)
    }
}

/// Starts console/network log forwarding for a page when enabled
async fn spawn_page_loggers(page: &Page, options: &ChromeOptions) -> Vec<JoinHandle<()>> {
    let mut listeners = Vec::new();

    if options.log_console {
        match page.event_listener::<EventConsoleApiCalled>().await {
            Ok(mut events) => listeners.push(tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    let level = match event.r#type {
                        ConsoleApiCalledType::Warning => "warning",
                        ConsoleApiCalledType::Error => "error",
                        _ => continue,
                    };
                    let text = event
                        .args
                        .iter()
                        .filter_map(|arg| {
                            arg.value
                                .as_ref()
                                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                                .or_else(|| arg.description.clone())
                        })
                        .collect::<Vec<_>>()
                        .join(" ");
                    tracing::warn!(target: "spa_crawler::page_console", "[console:{}] {}", level, text);
                }
            })),
            Err(e) => tracing::debug!("Console listener unavailable: {}", e),
        }

        match page.event_listener::<EventExceptionThrown>().await {
            Ok(mut events) => listeners.push(tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    let details = &event.exception_details;
                    let message = details
                        .exception
                        .as_ref()
                        .and_then(|e| e.description.clone())
                        .unwrap_or_else(|| details.text.clone());
                    tracing::warn!(target: "spa_crawler::page_console", "[pageerror] {}", message);
                }
            })),
            Err(e) => tracing::debug!("Exception listener unavailable: {}", e),
        }
    }

    if options.log_network {
        match page.event_listener::<EventResponseReceived>().await {
            Ok(mut events) => listeners.push(tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    let response = &event.response;
                    if response.status >= 400 {
                        tracing::warn!(
                            target: "spa_crawler::page_network",
                            "[network:{}] {} ({})",
                            response.status,
                            response.url,
                            response.mime_type
                        );
                    }
                }
            })),
            Err(e) => tracing::debug!("Network listener unavailable: {}", e),
        }
    }

    listeners
}

fn protocol_error(err: CdpError) -> RenderError {
    RenderError::Protocol(err.to_string())
}
