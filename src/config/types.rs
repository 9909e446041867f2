use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Navigation completion condition passed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// The `load` event fired
    Load,

    /// The DOM was parsed (`DOMContentLoaded`)
    ///
    /// The Chromium renderer cannot stop navigation earlier than the `load`
    /// event, so with that renderer this behaves exactly like [`WaitUntil::Load`].
    #[value(name = "domcontentloaded")]
    DomContentLoaded,

    /// No network activity for a short quiet window
    #[default]
    #[value(name = "networkidle")]
    NetworkIdle,
}

impl WaitUntil {
    /// Returns true if navigation must also wait for the network to go quiet
    pub fn needs_network_idle(self) -> bool {
        self == Self::NetworkIdle
    }
}

impl fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::DomContentLoaded => "domcontentloaded",
            Self::NetworkIdle => "networkidle",
        })
    }
}

/// Crawl configuration
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Only follow links that share the first seed's origin
    pub same_origin: bool,

    /// Number of concurrent workers
    pub concurrency: usize,

    /// Page budget for the whole crawl
    pub max_pages: usize,

    /// Per-visit navigation budget (milliseconds)
    pub timeout_ms: u64,

    /// Run the browser without a window
    pub headless: bool,

    /// Navigation completion condition
    pub wait_until: WaitUntil,

    /// Collect title and text for each page
    pub scrape: bool,

    /// CSS selector to wait for before extracting content
    pub wait_selector: Option<String>,

    /// Poll for text growth up to this many milliseconds
    pub wait_text_growth_ms: u64,

    /// Include the rendered HTML in each record
    pub include_html: bool,

    /// Retry timed-out URLs once with doubled budgets
    pub retry_failed: bool,

    /// Log page console warnings/errors and uncaught exceptions
    pub log_console: bool,

    /// Log responses with status >= 400
    pub log_network: bool,

    /// Follow links found on visited pages
    pub discover_links: bool,

    /// Character ceiling for extracted text
    pub max_text_chars: usize,

    /// Directory for full-page screenshots
    pub screenshot_dir: Option<PathBuf>,

    /// How long an idle worker waits for work before exiting (milliseconds)
    pub poll_timeout_ms: u64,

    /// Fixed delay after navigation to let the application hydrate (milliseconds)
    pub hydration_delay_ms: u64,

    /// Best-effort wait for the body to contain text (milliseconds)
    pub content_wait_ms: u64,

    /// Final settle before extraction for lazy-loaded content (milliseconds)
    pub lazy_settle_ms: u64,

    /// Custom browser user agent
    pub user_agent: Option<String>,

    /// Chrome/Chromium executable; discovered automatically when unset
    pub chrome_executable: Option<PathBuf>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            same_origin: true,
            concurrency: 5,
            max_pages: 1000,
            timeout_ms: 20_000,
            headless: true,
            wait_until: WaitUntil::NetworkIdle,
            scrape: true,
            wait_selector: None,
            wait_text_growth_ms: 0,
            include_html: false,
            retry_failed: true,
            log_console: false,
            log_network: false,
            discover_links: true,
            max_text_chars: 100_000,
            screenshot_dir: None,
            poll_timeout_ms: 1_000,
            hydration_delay_ms: 1_000,
            content_wait_ms: 5_000,
            lazy_settle_ms: 250,
            user_agent: None,
            chrome_executable: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_idle_waits_for_quiet_network() {
        assert!(WaitUntil::NetworkIdle.needs_network_idle());
        assert!(!WaitUntil::Load.needs_network_idle());
        assert!(!WaitUntil::DomContentLoaded.needs_network_idle());
    }

    #[test]
    fn test_wait_until_names() {
        assert_eq!(WaitUntil::DomContentLoaded.to_string(), "domcontentloaded");
        assert_eq!(WaitUntil::default(), WaitUntil::NetworkIdle);
    }
}
