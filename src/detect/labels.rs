use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// Load class names from a label file, one per line. Line `i` names class `i`.
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read label file {}", path.display()))?;
    let labels = parse_labels(&raw);
    if labels.is_empty() {
        return Err(anyhow!("label file {} contains no labels", path.display()));
    }
    log::debug!("loaded {} labels from {}", labels.len(), path.display());
    Ok(labels)
}

pub fn parse_labels(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_skipped() {
        let labels = parse_labels("person\n\n  chair \r\ntable\n");
        assert_eq!(labels, vec!["person", "chair", "table"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_labels(Path::new("/nonexistent/labels.txt")).unwrap_err();
        assert!(err.to_string().contains("failed to read label file"));
    }
}
