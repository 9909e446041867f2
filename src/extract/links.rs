//! Link discovery heuristics
//!
//! Client-side routers rarely stick to plain anchors, so several conventions
//! are probed in order:
//!
//! 1. `<a href>` anchors
//! 2. `data-href` / `data-url` / `data-link` attributes
//! 3. `href|url|link = '...'` assignments inside `onclick` handlers
//! 4. Any URL-looking attribute on anchors, `role="link"` elements and buttons
//!
//! The main document and every frame document are scanned, each resolved
//! against its own URL.

use super::RenderedPage;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Attributes that carry a router target, checked in priority order
const DATA_LINK_ATTRIBUTES: &[&str] = &["data-href", "data-url", "data-link"];

/// Elements whose attributes are scanned for URL-looking values
const NAVIGABLE_ELEMENTS: &str = "a, [role='link'], button";

/// Schemes that never lead to a crawlable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

static ONCLICK_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:href|url|link)\s*=\s*['"]([^'"]+)['"]"#)
        .expect("hardcoded regex pattern is valid")
});

static URL_LIKE_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://|/).+").expect("hardcoded regex pattern is valid")
});

/// Extracts absolute candidate links from a page and its frames
///
/// # Arguments
///
/// * `page` - Rendered snapshot of the main document and frames
///
/// # Returns
///
/// Absolute http(s) URLs, de-duplicated in first-seen order. Same-page
/// fragment links and non-navigational schemes are dropped.
///
/// # Example
///
/// ```
/// use spa_crawler::extract::{extract_links, RenderedPage};
///
/// let page = RenderedPage {
///     url: "https://a.test/docs/".to_string(),
///     html: r#"<a href="intro">Intro</a><div data-href="/faq"></div>"#.to_string(),
///     frames: Vec::new(),
/// };
/// assert_eq!(
///     extract_links(&page),
///     vec!["https://a.test/docs/intro", "https://a.test/faq"]
/// );
/// ```
pub fn extract_links(page: &RenderedPage) -> Vec<String> {
    let mut links = Vec::new();

    collect_document_links(&page.html, &page.url, &mut links);
    for frame in &page.frames {
        let base = if frame.url.is_empty() || frame.url == "about:blank" {
            &page.url
        } else {
            &frame.url
        };
        collect_document_links(&frame.html, base, &mut links);
    }

    let mut seen = HashSet::new();
    links.retain(|link| seen.insert(link.clone()));
    links
}

/// Collects resolved links from one document, in heuristic order
fn collect_document_links(html: &str, base: &str, links: &mut Vec<String>) {
    let Ok(base_url) = Url::parse(base) else {
        tracing::trace!("Skipping link extraction for unparseable base {}", base);
        return;
    };

    let document = Html::parse_document(html);
    let mut push = |href: &str| {
        if let Some(absolute) = resolve_link(href, &base_url) {
            links.push(absolute);
        }
    };

    // 1. Plain anchors
    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    // 2. Router data attributes, first non-empty one wins per element
    if let Ok(selector) = Selector::parse("[data-href], [data-url], [data-link]") {
        for element in document.select(&selector) {
            if let Some(href) = first_data_link(&element) {
                push(href);
            }
        }
    }

    // 3. Targets assigned inside onclick handlers
    if let Ok(selector) = Selector::parse("[onclick]") {
        for element in document.select(&selector) {
            let handler = element.value().attr("onclick").unwrap_or_default();
            if let Some(target) = ONCLICK_TARGET.captures(handler).and_then(|c| c.get(1)) {
                push(target.as_str());
            }
        }
    }

    // 4. URL-looking attribute values on navigable elements
    if let Ok(selector) = Selector::parse(NAVIGABLE_ELEMENTS) {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
            for (_, value) in element.value().attrs() {
                if URL_LIKE_VALUE.is_match(value) {
                    push(value);
                }
            }
        }
    }
}

fn first_data_link<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    DATA_LINK_ATTRIBUTES
        .iter()
        .filter_map(|name| element.value().attr(name))
        .find(|value| !value.is_empty())
}

/// Resolves an href to an absolute http(s) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Same-page fragment links
/// - Invalid URLs or non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if matches!(absolute.scheme(), "http" | "https") => Some(absolute.into()),
        _ => None,
    }
}
