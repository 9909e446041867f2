//! Crawl phase definitions for the retry protocol
//!
//! A crawl runs at most two passes: the primary pass and a single retry pass
//! for URLs that timed out. The phase only moves forward.

use std::fmt;

/// Represents the pass the crawl is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Draining the frontier seeded with the start URLs
    Primary,

    /// Re-visiting URLs that timed out, with doubled budgets
    Retry,

    /// No further passes will run
    Done,
}

impl CrawlPhase {
    /// Returns the phase after the current pass's join barrier completed
    ///
    /// # Arguments
    ///
    /// * `retry_enabled` - Whether timed-out URLs may be retried
    /// * `has_failed_timeouts` - Whether the pass recorded any timeouts
    ///
    /// # Returns
    ///
    /// `Retry` only when leaving `Primary` with retry enabled and at least
    /// one timeout; `Done` otherwise.
    pub fn next(self, retry_enabled: bool, has_failed_timeouts: bool) -> Self {
        match self {
            Self::Primary if retry_enabled && has_failed_timeouts => Self::Retry,
            Self::Primary | Self::Retry | Self::Done => Self::Done,
        }
    }

    /// Returns true if a pass runs in this phase
    pub fn runs_pass(&self) -> bool {
        matches!(self, Self::Primary | Self::Retry)
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary pass",
            Self::Retry => "retry pass",
            Self::Done => "done",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_without_failures_finishes() {
        assert_eq!(CrawlPhase::Primary.next(true, false), CrawlPhase::Done);
    }

    #[test]
    fn test_primary_with_failures_retries() {
        assert_eq!(CrawlPhase::Primary.next(true, true), CrawlPhase::Retry);
    }

    #[test]
    fn test_retry_disabled_skips_retry() {
        assert_eq!(CrawlPhase::Primary.next(false, true), CrawlPhase::Done);
    }

    #[test]
    fn test_retry_runs_exactly_once() {
        // Failures after the retry pass never lead to another pass
        assert_eq!(CrawlPhase::Retry.next(true, true), CrawlPhase::Done);
        assert_eq!(CrawlPhase::Done.next(true, true), CrawlPhase::Done);
    }

    #[test]
    fn test_phase_predicates() {
        assert!(CrawlPhase::Primary.runs_pass());
        assert!(CrawlPhase::Retry.runs_pass());
        assert!(!CrawlPhase::Done.runs_pass());
    }

    #[test]
    fn test_display() {
        assert_eq!(CrawlPhase::Retry.to_string(), "retry pass");
    }
}
