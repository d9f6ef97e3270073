//! Media query result models.
//!
//! A `MediaRecord` is synthesized on every listing call from the storage
//! backend's listing, metadata, and URL-signing responses. It is never
//! persisted: the `access_url` expires on its own schedule, so a record must
//! not be treated as a stable reference to the underlying object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One stored image as seen by listing and tag queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MediaRecord {
    /// The object's storage key (`{owner_id}/{media_id}{extension}`).
    pub id: String,
    /// Last-modified timestamp reported by the storage backend.
    pub last_modified: DateTime<Utc>,
    /// Up to 3 tags, in metadata slot order.
    pub tags: Vec<String>,
    /// Presigned GET URL, valid for a fixed window from generation.
    pub access_url: String,
}

/// Response body for a successful upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Identifier of the newly stored image (UUID-shaped string).
    pub media_id: String,
}

/// Response body for tag suggestion.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuggestTagsResponse {
    /// Ranked candidate tags from the suggestion service, best first.
    pub tags: Vec<String>,
}
