//! Tag suggestion provider abstraction.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Tag suggestion failures, reported to callers verbatim. The media index
/// performs no fallback or retry on top of these.
#[derive(Debug, Error)]
pub enum TagSuggestError {
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Suggestion API error (status {status}): {detail}")]
    Api { status: u16, detail: String },
}

/// Provider that suggests descriptive tags for a local image file.
///
/// Implementations return a ranked list, best candidate first. Callers pass
/// the result through untouched; count and content are the provider's
/// business.
#[async_trait]
pub trait TagSuggester: Send + Sync {
    async fn suggest(&self, image_path: &Path) -> Result<Vec<String>, TagSuggestError>;
}
