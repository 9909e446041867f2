//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: Tracks which pass the crawl is in (primary, retry, done)

mod crawl_phase;

// Re-export main types
pub use crawl_phase::CrawlPhase;
