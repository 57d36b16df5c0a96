// Target list parsing and merging

use std::fs;
use std::path::Path;

use crate::error::{EngineError, Result};

/// One target per line; surrounding whitespace and blank lines are dropped.
pub fn parse_targets(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load newline-delimited targets from a file
pub fn load_targets_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        EngineError::InvalidInput(format!("Failed to read targets file {}: {}", path.display(), e))
    })?;
    Ok(parse_targets(&content))
}

/// Explicit targets first, then any file-derived ones, in order.
///
/// Duplicates are kept: every occurrence is probed and reported on its own.
pub fn merge_targets(explicit: Vec<String>, from_file: Option<Vec<String>>) -> Vec<String> {
    let mut targets: Vec<String> = explicit
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    targets.extend(from_file.unwrap_or_default());
    targets
}
