use anyhow::{Context, Result};
use std::path::Path;

/// Read the newline-delimited headline corpus in full. Blank lines and
/// surrounding whitespace are discarded.
pub fn load(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read headline corpus at {}", path.display()))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect())
}
