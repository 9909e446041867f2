//! Markdown export
//!
//! Each result becomes one block:
//!
//! ```text
//! # <title or url>
//!
//! URL: <url>
//!
//! <text>
//!
//! ---
//! ```

use super::{ensure_parent_dir, OutputResult};
use crate::crawler::VisitResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes results as a Markdown document
///
/// # Arguments
///
/// * `results` - Records in the order they should appear
/// * `output_path` - Destination file; missing parent directories are created
pub fn write_markdown(results: &[VisitResult], output_path: &Path) -> OutputResult<()> {
    ensure_parent_dir(output_path)?;

    let markdown = format_markdown(results);
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats results as concatenated Markdown blocks
///
/// A missing or empty title falls back to the URL; missing text is rendered
/// as an empty body.
pub fn format_markdown(results: &[VisitResult]) -> String {
    let mut md = String::new();

    for result in results {
        let heading = result
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(result.url.as_str());

        md.push_str(&format!("# {}\n\n", heading));
        md.push_str(&format!("URL: {}\n\n", result.url));
        md.push_str(result.text.as_deref().unwrap_or_default());
        md.push_str("\n\n---\n\n");
    }

    md
}
