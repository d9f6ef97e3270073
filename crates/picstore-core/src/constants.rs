//! Application-wide constants.

/// Metadata slot names for per-object tags, in extraction order.
/// These names are the on-disk contract for stored objects and must not change.
pub const TAG_METADATA_KEYS: [&str; 3] = ["tag_zero", "tag_one", "tag_two"];

/// Maximum number of tags attached to a stored object. Extra tags supplied to
/// the upload path are dropped, not rejected.
pub const MAX_TAGS_PER_IMAGE: usize = 3;

/// Validity window for presigned access URLs, in seconds. Access URLs are
/// regenerated on every listing call and are never persisted.
pub const SIGNED_URL_EXPIRY_SECS: u64 = 300;
