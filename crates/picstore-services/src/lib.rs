//! Picstore Services Library
//!
//! External service clients consumed by the media index: currently the tag
//! suggestion provider, which turns local image bytes into ranked descriptive
//! keywords.

pub mod google_vision;
pub mod suggest;

// Re-export commonly used types
pub use google_vision::GoogleVisionTagSuggester;
pub use suggest::{TagSuggestError, TagSuggester};
