//! A single page visit
//!
//! Each visit opens its own isolated session, waits for the application to
//! settle, snapshots the rendered document and hands it to the extractor. The
//! session is closed on every exit path and the attempt is reported as a typed
//! [`VisitOutcome`].

use super::results::VisitResult;
use super::scheduler::CrawlTask;
use crate::config::{CrawlConfig, WaitUntil};
use crate::extract::{Extractor, RenderedPage};
use crate::render::{RenderError, RenderSession, Renderer};
use crate::url::{canonicalize, CanonicalUrl};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound for the optional selector wait
const SELECTOR_WAIT_CAP: Duration = Duration::from_secs(10);

/// Interval between text-growth samples
const TEXT_GROWTH_INTERVAL: Duration = Duration::from_millis(200);

/// Holds once the application has rendered some text
const CONTENT_READY_PREDICATE: &str = "document.body && document.body.innerText.length > 50";

/// Maximum length of a screenshot file stem
const SCREENSHOT_NAME_LIMIT: usize = 200;

/// Per-visit timing and extraction settings
#[derive(Debug, Clone)]
pub struct VisitSettings {
    pub timeout: Duration,
    pub wait_until: WaitUntil,
    pub hydration_delay: Duration,
    pub content_wait: Duration,
    pub wait_selector: Option<String>,
    pub lazy_settle: Duration,
    pub text_growth: Duration,
    pub discover_links: bool,
    pub scrape: bool,
    pub include_html: bool,
    pub screenshot_dir: Option<PathBuf>,
}

impl VisitSettings {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            wait_until: config.wait_until,
            hydration_delay: Duration::from_millis(config.hydration_delay_ms),
            content_wait: Duration::from_millis(config.content_wait_ms),
            wait_selector: config.wait_selector.clone(),
            lazy_settle: Duration::from_millis(config.lazy_settle_ms),
            text_growth: Duration::from_millis(config.wait_text_growth_ms),
            discover_links: config.discover_links,
            scrape: config.scrape,
            include_html: config.include_html,
            screenshot_dir: config.screenshot_dir.clone(),
        }
    }

    /// Settings for the retry pass: navigation timeout and text-growth budget doubled
    pub fn doubled(&self) -> Self {
        Self {
            timeout: self.timeout.saturating_mul(2),
            text_growth: self.text_growth.saturating_mul(2),
            ..self.clone()
        }
    }
}

/// Content produced by a successful visit
#[derive(Debug, Clone)]
pub struct PageVisit {
    /// The record for this page
    pub result: VisitResult,

    /// Canonicalized candidate links, not yet filtered by origin or budget
    pub links: Vec<CanonicalUrl>,
}

/// Typed result of one visit attempt
#[derive(Debug)]
pub enum VisitOutcome {
    /// The page rendered and was extracted
    Success(PageVisit),

    /// Navigation or a required wait ran out of time
    Timeout(RenderError),

    /// Any other failure
    Failed(RenderError),
}

impl VisitOutcome {
    fn from_error(err: RenderError) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else {
            Self::Failed(err)
        }
    }
}

/// Visits one task in a fresh session
///
/// # Arguments
///
/// * `renderer` - Shared browser handle
/// * `extractor` - Link/text heuristics
/// * `settings` - Budgets for this pass
/// * `task` - The claimed task
///
/// # Returns
///
/// A [`VisitOutcome`]; this function never fails outright.
pub async fn visit(
    renderer: &dyn Renderer,
    extractor: &dyn Extractor,
    settings: &VisitSettings,
    task: &CrawlTask,
) -> VisitOutcome {
    let mut session = match renderer.open_session().await {
        Ok(session) => session,
        Err(e) => return VisitOutcome::from_error(e),
    };

    let outcome = render_page(session.as_mut(), extractor, settings, task).await;

    if let Err(e) = session.close().await {
        tracing::debug!("Failed to close session for {}: {}", task.url, e);
    }

    match outcome {
        Ok(page) => VisitOutcome::Success(page),
        Err(e) => VisitOutcome::from_error(e),
    }
}

async fn render_page(
    session: &mut dyn RenderSession,
    extractor: &dyn Extractor,
    settings: &VisitSettings,
    task: &CrawlTask,
) -> Result<PageVisit, RenderError> {
    // Step 1: Navigate, the only wait that can fail the visit
    let status = session
        .navigate(task.url.as_str(), settings.timeout, settings.wait_until)
        .await?;

    // Step 2: Let the application hydrate and render
    sleep_for(settings.hydration_delay).await;

    if !settings.content_wait.is_zero() {
        if let Err(e) = session
            .wait_for_function(CONTENT_READY_PREDICATE, settings.content_wait)
            .await
        {
            tracing::trace!("Content wait on {} gave up: {}", task.url, e);
        }
    }

    if let Some(selector) = &settings.wait_selector {
        let budget = settings.timeout.min(SELECTOR_WAIT_CAP);
        if let Err(e) = session.wait_for_selector(selector, budget).await {
            tracing::debug!("Selector '{}' not found on {}: {}", selector, task.url, e);
        }
    }

    sleep_for(settings.lazy_settle).await;

    // Step 3: Snapshot the rendered document
    let page_url = session
        .current_url()
        .await
        .ok()
        .flatten()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| task.url.to_string());
    let html = session.rendered_html().await?;
    let frames = if settings.discover_links || settings.scrape {
        session.frames().await.unwrap_or_else(|e| {
            tracing::debug!("Frame inspection failed on {}: {}", task.url, e);
            Vec::new()
        })
    } else {
        Vec::new()
    };
    let mut rendered = RenderedPage {
        url: page_url,
        html,
        frames,
    };

    // Step 4: Links
    let links = if settings.discover_links {
        extractor
            .extract_links(&rendered)
            .iter()
            .filter_map(|link| canonicalize(link))
            .collect()
    } else {
        Vec::new()
    };

    // Step 5: Content
    let mut result = VisitResult::failed(task.url.clone(), task.depth);
    result.status = status;

    if settings.scrape {
        result.title = session
            .title()
            .await
            .unwrap_or_else(|e| {
                tracing::debug!("Title lookup failed on {}: {}", task.url, e);
                None
            })
            .filter(|t| !t.trim().is_empty());

        let mut text = extractor.extract_text(&rendered);
        if !settings.text_growth.is_zero() {
            text = wait_for_text_growth(
                session,
                extractor,
                &mut rendered,
                text,
                settings.text_growth,
            )
            .await;
        }
        result.text = Some(text).filter(|t| !t.is_empty());

        if settings.include_html {
            result.raw_html = Some(rendered.html);
        }
    }

    // Step 6: Screenshot, never fatal
    if let Some(dir) = &settings.screenshot_dir {
        let path = screenshot_path(dir, task.url.as_str());
        if let Err(e) = session.screenshot(&path).await {
            tracing::warn!("Screenshot of {} failed: {}", task.url, e);
        }
    }

    Ok(PageVisit { result, links })
}

/// Re-reads the page until `budget` elapses, keeping the longest text seen
///
/// `rendered` is updated to the snapshot that produced the kept text.
async fn wait_for_text_growth(
    session: &mut dyn RenderSession,
    extractor: &dyn Extractor,
    rendered: &mut RenderedPage,
    mut best: String,
    budget: Duration,
) -> String {
    let started = Instant::now();
    let mut best_len = best.chars().count();

    while started.elapsed() < budget {
        let html = match session.rendered_html().await {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!("Text growth sampling stopped: {}", e);
                break;
            }
        };

        let sample = RenderedPage {
            url: rendered.url.clone(),
            html,
            frames: rendered.frames.clone(),
        };
        let text = extractor.extract_text(&sample);
        let len = text.chars().count();
        if len > best_len {
            best = text;
            best_len = len;
            *rendered = sample;
        }

        tokio::time::sleep(TEXT_GROWTH_INTERVAL).await;
    }

    best
}

/// Builds `<dir>/<sanitized url>.png`
///
/// Every run of characters outside `[A-Za-z0-9_-]` becomes one underscore and
/// the stem is cut at 200 characters.
pub fn screenshot_path(dir: &Path, url: &str) -> PathBuf {
    let mut stem = String::with_capacity(url.len());
    let mut in_run = false;

    for c in url.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            stem.push(c);
            in_run = false;
        } else if !in_run {
            stem.push('_');
            in_run = true;
        }
    }
    stem.truncate(SCREENSHOT_NAME_LIMIT);

    dir.join(format!("{}.png", stem))
}

async fn sleep_for(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
