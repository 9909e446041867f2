//! Crawler module: the scheduling core
//!
//! This module contains the crawl orchestration, including:
//! - The frontier and visit ledger with admission control
//! - The worker pool and its join barrier
//! - Single page visits through the renderer and extractor
//! - The primary/retry pass protocol and result aggregation

mod coordinator;
mod results;
mod scheduler;
mod visit;
mod worker;

pub use coordinator::{crawl, Coordinator};
pub use results::{CrawlReport, ResultAggregator, VisitResult};
pub use scheduler::{Admission, CrawlTask, Scheduler};
pub use visit::{screenshot_path, visit, PageVisit, VisitOutcome, VisitSettings};
