//! Domain models shared across components.

pub mod media;

pub use media::{MediaRecord, SuggestTagsResponse, UploadResponse};
