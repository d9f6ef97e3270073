//! Shared key generation for storage backends.
//!
//! Key format: `{owner_id}/{media_id}{extension}`. The owner prefix is the
//! only partitioning mechanism over the backend's flat namespace.

use uuid::Uuid;

/// Build the storage key for a newly uploaded image.
///
/// `extension` must include its leading dot (e.g. `.png`). All backends must
/// use this format for consistency; it is the on-disk contract.
pub fn media_key(owner_id: &str, media_id: Uuid, extension: &str) -> String {
    format!("{}/{}{}", owner_id, media_id, extension)
}

/// Listing prefix covering all of one owner's objects.
pub fn owner_prefix(owner_id: &str) -> String {
    format!("{}/", owner_id)
}
