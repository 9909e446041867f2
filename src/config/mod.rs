//! Configuration module
//!
//! This module handles loading, parsing, and validating crawl settings from an
//! optional TOML file, plus loading seed URLs from JSON URL-list files.
//!
//! # Example
//!
//! ```no_run
//! use spa_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawling with {} workers", config.concurrency);
//! ```

mod parser;
mod types;
mod url_list;
mod validation;

// Re-export types
pub use types::{CrawlConfig, WaitUntil};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use url_list::{collect_urls, load_url_list};
pub use validation::validate;
