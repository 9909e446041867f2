//! Readable text extraction
//!
//! Content containers are tried first; if none holds a meaningful block the
//! whole body is used with navigation chrome stripped. Frame documents add
//! their own text. The result is collapsed to single spaces and truncated.

use super::RenderedPage;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Likely application/content roots, in priority order
const CONTENT_SELECTORS: &[&str] = &[
    "#root",
    "#app",
    "#__next",
    "[data-reactroot]",
    "article",
    "main",
    "[role='main']",
    "[role='article']",
    ".article",
    ".content",
    ".post",
    ".entry-content",
    ".kb-article",
    ".knowledge-base-article",
    ".kbContent",
    ".z_kb",
    ".article-body",
    ".article-content",
    ".post-content",
    ".page-content",
];

/// Blocks at or below this many characters are not considered content
const MIN_BLOCK_CHARS: usize = 100;

/// Elements that never contribute text
const NON_TEXT_ELEMENTS: &str = "script, style, noscript";

/// Boilerplate removed from the whole-body fallback
const BOILERPLATE_ELEMENTS: &str =
    "script, style, noscript, nav, header, footer, .nav, .header, .footer, .sidebar, .menu";

/// Elements that start a new line of rendered text
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "dd", "details", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "li", "main", "nav", "ol", "option", "p", "pre", "section",
    "summary", "table", "td", "th", "title", "tr", "ul",
];

/// Extracts normalized text from a page and its frames
///
/// # Arguments
///
/// * `page` - Rendered snapshot of the main document and frames
/// * `max_chars` - Character ceiling for the result
///
/// # Returns
///
/// Single-spaced text truncated to `max_chars` characters; empty when the page
/// has no readable text.
pub fn extract_text(page: &RenderedPage, max_chars: usize) -> String {
    let mut parts = Vec::new();

    let document = Html::parse_document(&page.html);
    let main_text = container_text(&document).unwrap_or_else(|| body_text(&document));
    if !main_text.is_empty() {
        parts.push(main_text);
    }

    for frame in &page.frames {
        let frame_text = document_text(&frame.html);
        if !frame_text.is_empty() {
            parts.push(frame_text);
        }
    }

    truncate_chars(&normalize_whitespace(&parts.join("\n")), max_chars)
}

/// Returns the visible text of a whole HTML document
///
/// Only script-like elements are removed. Frame documents are read this way.
pub fn document_text(html: &str) -> String {
    let document = Html::parse_document(html);
    match Selector::parse(NON_TEXT_ELEMENTS) {
        Ok(skip) => normalize_whitespace(&visible_text(document.root_element(), &skip)),
        Err(_) => String::new(),
    }
}

/// Collapses every whitespace run to a single space and trims the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max_chars` characters, never splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

/// Text of every content container holding a meaningful block
fn container_text(document: &Html) -> Option<String> {
    let skip = Selector::parse(NON_TEXT_ELEMENTS).ok()?;
    let mut seen = HashSet::new();
    let mut blocks = Vec::new();

    for raw in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for element in document.select(&selector) {
            let block = normalize_whitespace(&visible_text(element, &skip));
            if block.chars().count() > MIN_BLOCK_CHARS && seen.insert(block.clone()) {
                blocks.push(block);
            }
        }
    }

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}

/// Body text without boilerplate, falling back to the full body
fn body_text(document: &Html) -> String {
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let stripped = Selector::parse(BOILERPLATE_ELEMENTS)
        .map(|skip| normalize_whitespace(&visible_text(body, &skip)))
        .unwrap_or_default();
    if !stripped.is_empty() {
        return stripped;
    }

    Selector::parse(NON_TEXT_ELEMENTS)
        .map(|skip| normalize_whitespace(&visible_text(body, &skip)))
        .unwrap_or_default()
}

/// Concatenates text under `root`, leaving out subtrees that match `skip`
///
/// Inline markup does not split words; block elements are padded with spaces
/// so neighbouring blocks stay separate after whitespace normalization.
fn visible_text(root: ElementRef<'_>, skip: &Selector) -> String {
    let mut text = String::new();
    push_visible_text(root, skip, &mut text);
    text
}

fn push_visible_text(element: ElementRef<'_>, skip: &Selector, out: &mut String) {
    if skip.matches(&element) {
        return;
    }

    let block = BLOCK_ELEMENTS.contains(&element.value().name());
    if block {
        out.push(' ');
    }

    for child in element.children() {
        if let Node::Text(text) = child.value() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            push_visible_text(child, skip, out);
        }
    }

    if block {
        out.push(' ');
    }
}
