//! Object-store abstraction trait
//!
//! This module defines the ObjectStore trait that all storage backends must
//! implement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use picstore_core::StorageBackend;
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors.
///
/// Write-path failures (`WriteFailed`) and read-path failures (`ReadFailed`)
/// are kept apart so callers can map them to different responses; `NotFound`
/// is an expected condition, not a transport failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Per-object state returned by a metadata fetch.
#[derive(Debug, Clone)]
pub struct ObjectHead {
    /// Last-modified timestamp reported by the backend.
    pub last_modified: DateTime<Utc>,
    /// User metadata attached to the object at upload time.
    pub metadata: HashMap<String, String>,
}

/// Object-store abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// This allows the media index to work with any backend without coupling to
/// implementation details.
///
/// **Key format:** keys are owner-scoped: `{owner_id}/{media_id}{extension}`.
/// See the crate root documentation.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload an object from a stream/reader, attaching user metadata.
    ///
    /// The reader is consumed until EOF without buffering the whole payload
    /// in memory. Stored objects are immutable; a key is never overwritten
    /// because media ids are freshly minted per upload.
    async fn put_stream(
        &self,
        key: &str,
        content_type: &str,
        content_length: Option<u64>,
        reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
        metadata: HashMap<String, String>,
    ) -> StorageResult<()>;

    /// List all keys under a prefix, in backend order. An owner with no
    /// objects yields an empty Vec; interpreting that as "not found" is the
    /// caller's business.
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Fetch an object's last-modified time and user metadata without its body.
    async fn head(&self, key: &str) -> StorageResult<ObjectHead>;

    /// Generate a presigned/temporary GET URL for direct access.
    ///
    /// This gives clients time-bounded access to one object without going
    /// through the application server.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
