//! JSON export

use super::{ensure_parent_dir, OutputResult};
use crate::crawler::VisitResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes results as a pretty-printed JSON array
///
/// Missing parent directories are created.
///
/// # Arguments
///
/// * `results` - Records in the order they should appear
/// * `output_path` - Destination file
pub fn write_json(results: &[VisitResult], output_path: &Path) -> OutputResult<()> {
    ensure_parent_dir(output_path)?;

    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    Ok(())
}
