//! Content extraction from rendered pages
//!
//! The crawler hands the rendered HTML of a page (and of any inspectable
//! frames) to an [`Extractor`], which returns candidate links and a plain-text
//! body. The default [`HeuristicExtractor`] parses snapshots with `scraper` and
//! keeps every heuristic in ordered selector/attribute tables.

mod links;
mod text;

pub use links::extract_links;
pub use text::{document_text, extract_text, normalize_whitespace, truncate_chars};

use crate::render::FrameDocument;

/// Snapshot of a rendered page, main document plus nested frames
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    /// URL of the main document, used as the base for relative links
    pub url: String,

    /// Serialized main document
    pub html: String,

    /// Documents of inspectable nested frames
    pub frames: Vec<FrameDocument>,
}

/// Produces links and text from a rendered page
pub trait Extractor: Send + Sync {
    /// Returns absolute candidate URLs in first-seen order
    ///
    /// Links are not canonicalized and not filtered by origin; that is the
    /// scheduler's job.
    fn extract_links(&self, page: &RenderedPage) -> Vec<String>;

    /// Returns the normalized, truncated body text (possibly empty)
    fn extract_text(&self, page: &RenderedPage) -> String;
}

/// Selector-table driven extractor
#[derive(Debug, Clone)]
pub struct HeuristicExtractor {
    max_text_chars: usize,
}

impl HeuristicExtractor {
    /// Creates an extractor that truncates text to `max_text_chars` characters
    pub fn new(max_text_chars: usize) -> Self {
        Self { max_text_chars }
    }
}

impl Extractor for HeuristicExtractor {
    fn extract_links(&self, page: &RenderedPage) -> Vec<String> {
        extract_links(page)
    }

    fn extract_text(&self, page: &RenderedPage) -> String {
        extract_text(page, self.max_text_chars)
    }
}
