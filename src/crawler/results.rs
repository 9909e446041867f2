//! Visit records and their aggregation

use crate::url::CanonicalUrl;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

/// Record emitted for one processed URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitResult {
    /// Canonical URL of the page
    pub url: CanonicalUrl,

    /// HTTP status of the main document, when known
    pub status: Option<u16>,

    /// Link distance from the seed
    pub depth: u32,

    /// Document title
    pub title: Option<String>,

    /// Normalized page text
    pub text: Option<String>,

    /// Rendered HTML, when requested
    pub raw_html: Option<String>,
}

impl VisitResult {
    /// A record for a visit that failed before producing content
    pub fn failed(url: CanonicalUrl, depth: u32) -> Self {
        Self {
            url,
            status: None,
            depth,
            title: None,
            text: None,
            raw_html: None,
        }
    }
}

/// Append-only collection of results in completion order
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Mutex<Vec<VisitResult>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finished visit
    pub fn push(&self, result: VisitResult) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result);
    }

    /// Number of results collected so far
    pub fn len(&self) -> usize {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the results collected so far
    pub fn snapshot(&self) -> Vec<VisitResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Consumes the aggregator, returning results in completion order
    pub fn into_results(self) -> Vec<VisitResult> {
        self.results
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Outcome of a whole crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// One record per processed URL, in completion order
    pub results: Vec<VisitResult>,

    /// URLs that timed out in the primary pass and were retried
    pub retried: Vec<CanonicalUrl>,

    /// URLs that still timed out after the retry pass (absent from `results`)
    pub failed_after_retry: Vec<CanonicalUrl>,
}
