//! spa-crawler: a bounded crawler for JavaScript-rendered web applications
//!
//! This crate drives a headless browser over a single-page application, discovers
//! links that only exist after client-side rendering, and emits one record per
//! visited page. The scheduling core (frontier, visit ledger, worker pool and the
//! single retry pass) lives in [`crawler`]; rendering and content extraction sit
//! behind the [`render::Renderer`] and [`extract::Extractor`] seams.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod render;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Renderer error: {0}")]
    Render(#[from] render::RenderError),

    #[error("No valid start URL was provided")]
    NoSeeds,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while loading a URL-list input file
#[derive(Debug, Error)]
pub enum UrlListError {
    #[error("URLs file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read URLs file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse URLs file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{CrawlConfig, WaitUntil};
pub use crawler::{crawl, CrawlReport, VisitResult};
pub use url::{canonicalize, same_origin, CanonicalUrl};
