
use tracing::debug;

use crate::{Result, ReviewerError};

/// A contiguous, trimmed window of guideline text, the unit of embedding and
/// retrieval. `chunk_index` records insertion order within the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidelineChunk {
    pub text: String,
    pub chunk_index: usize,
}

/// Split text into overlapping character windows.
///
/// The window advances by `chunk_size - overlap` characters per step. Each
/// window is trimmed and empty windows are dropped; the final partial window
/// is still emitted when non-empty. Identical input and parameters always
/// produce an identical chunk sequence, so re-running an index build is
/// idempotent.
#[inline]
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<GuidelineChunk>> {
    if chunk_size == 0 {
        return Err(ReviewerError::Config(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(ReviewerError::Config(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            overlap, chunk_size
        )));
    }

    let normalized: Vec<char> = text.trim().chars().collect();
    if normalized.is_empty() {
        return Ok(Vec::new());
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < normalized.len() {
        let end = (start + chunk_size).min(normalized.len());
        let window: String = normalized[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(GuidelineChunk {
                text: trimmed.to_string(),
                chunk_index: chunks.len(),
            });
        }
        start += step;
    }

    debug!(
        "Chunked {} characters into {} chunks (size {}, overlap {})",
        normalized.len(),
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}
