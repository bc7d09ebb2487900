use pkb_core::error::AppError;
use pkb_core::normalize::normalize_text;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: usize = 700;
pub const DEFAULT_CHUNK_OVERLAP: usize = 120;

/// Sliding-window parameters, both measured in characters (Unicode scalar values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, AppError> {
        let cfg = Self {
            chunk_size,
            chunk_overlap,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// The window must advance on every step, otherwise chunking would never terminate.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(AppError::new(
                "PKB_CONFIG_INVALID",
                "chunk_overlap must be smaller than a non-zero chunk_size",
            )
            .with_details(format!(
                "chunk_size={}; chunk_overlap={}",
                self.chunk_size, self.chunk_overlap
            )));
        }
        Ok(())
    }

    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// Split document text into overlapping windows.
///
/// The text is normalized first (see [`normalize_text`]); blank input yields no chunks. Each
/// window starts `stride()` characters after the previous one and the last window is clipped to
/// the end of the text.
pub fn chunk_text(text: &str, cfg: &ChunkConfig) -> Result<Vec<String>, AppError> {
    cfg.validate()?;

    let normalized = normalize_text(text);
    if normalized.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every char boundary, including the end of the string.
    let bounds: Vec<usize> = normalized
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(normalized.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut out = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + cfg.chunk_size).min(total);
        out.push(normalized[bounds[start]..bounds[end]].to_string());
        if end == total {
            break;
        }
        start = end - cfg.chunk_overlap;
    }
    Ok(out)
}
