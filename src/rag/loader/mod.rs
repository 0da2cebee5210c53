
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::{Result, ReviewerError};

/// Load guideline text from a `.md` or `.txt` file.
///
/// The guideline document is read once per index build; the returned content
/// is trimmed and guaranteed non-empty.
#[inline]
pub fn load_guideline(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ReviewerError::NotFound(format!(
            "Guideline file not found: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(ReviewerError::Config(format!(
            "Guideline path is not a file: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if extension != "md" && extension != "txt" {
        return Err(ReviewerError::Config(format!(
            "Unsupported guideline format '{}'. Use .md or .txt",
            extension
        )));
    }

    let content = fs::read_to_string(path)?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ReviewerError::Config(format!(
            "Guideline file is empty: {}",
            path.display()
        )));
    }

    debug!(
        "Loaded {} characters of guideline text from {}",
        trimmed.chars().count(),
        path.display()
    );

    Ok(trimmed.to_string())
}
