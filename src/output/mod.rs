//! Output module for writing crawl results
//!
//! This module handles:
//! - Writing results as a pretty-printed JSON array
//! - Exporting results as a Markdown document
//! - Formatting the final summary line

mod json;
mod markdown;

pub use json::write_json;
pub use markdown::{format_markdown, write_markdown};

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Formats the line printed once all outputs are written
///
/// # Examples
///
/// ```
/// use spa_crawler::output::summary_line;
/// use std::path::Path;
///
/// assert_eq!(
///     summary_line(3, Path::new("out.json"), Some(Path::new("out.md"))),
///     "Wrote 3 pages to out.json and out.md"
/// );
/// ```
pub fn summary_line(pages: usize, json_path: &Path, markdown_path: Option<&Path>) -> String {
    match markdown_path {
        Some(md) => format!(
            "Wrote {} pages to {} and {}",
            pages,
            json_path.display(),
            md.display()
        ),
        None => format!("Wrote {} pages to {}", pages, json_path.display()),
    }
}

/// Creates the parent directory of `path` if it has one
fn ensure_parent_dir(path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
