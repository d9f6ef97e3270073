use crate::traits::{ObjectHead, ObjectStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncRead;

/// Suffix of the JSON sidecar holding an object's user metadata.
const META_SUFFIX: &str = ".meta.json";

/// Local filesystem object-store implementation.
///
/// Objects are stored as plain files under a base directory; user metadata
/// lives in a `<key>.meta.json` sidecar because the filesystem has no native
/// metadata map. "Presigned" URLs are plain URLs with an `expires` query
/// parameter; no actual signing happens. Intended for tests and local
/// development.
#[derive(Clone)]
pub struct LocalObjectStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    /// Create a new LocalObjectStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for object storage (e.g., "/var/lib/picstore/media")
    /// * `base_url` - Base URL for serving objects (e.g., "http://localhost:4321/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::Config(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalObjectStore {
            base_path,
            base_url,
        })
    }

    /// Convert a storage key to a filesystem path, rejecting keys that could
    /// escape the base directory.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.contains("..") || key.starts_with('/') || key.is_empty() {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        Ok(self.base_path.join(key))
    }

    fn meta_path(object_path: &Path) -> PathBuf {
        let mut os_string = object_path.as_os_str().to_os_string();
        os_string.push(META_SUFFIX);
        PathBuf::from(os_string)
    }

    fn generate_url(&self, key: &str, expires_in: Duration) -> String {
        format!(
            "{}/{}?expires={}",
            self.base_url.trim_end_matches('/'),
            key,
            expires_in.as_secs()
        )
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_stream(
        &self,
        key: &str,
        content_type: &str,
        _content_length: Option<u64>,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
        metadata: HashMap<String, String>,
    ) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to write stream to file {}: {}",
                path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let sidecar = serde_json::json!({
            "content_type": content_type,
            "metadata": metadata,
        });
        fs::write(Self::meta_path(&path), sidecar.to_string())
            .await
            .map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to write metadata sidecar for {}: {}",
                    path.display(),
                    e
                ))
            })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        // The prefix is validated like a key; a trailing '/' is fine for join
        if prefix.contains("..") || prefix.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let root = self.base_path.join(prefix.trim_end_matches('/'));
        if !fs::try_exists(&root).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut pending = vec![root];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(|e| {
                StorageError::ReadFailed(format!("Failed to read {}: {}", dir.display(), e))
            })?;

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                StorageError::ReadFailed(format!("Failed to read {}: {}", dir.display(), e))
            })? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| {
                    StorageError::ReadFailed(format!("Failed to stat {}: {}", path.display(), e))
                })?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Ok(relative) = path.strip_prefix(&self.base_path) else {
                    continue;
                };
                let key = relative.to_string_lossy().replace('\\', "/");
                if key.ends_with(META_SUFFIX) {
                    continue;
                }
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        // Directory iteration order is platform-defined; sort for a stable
        // listing order, matching the lexicographic order S3 returns.
        keys.sort();

        Ok(keys)
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectHead> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let file_meta = fs::metadata(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to stat {}: {}", path.display(), e))
        })?;
        let modified = file_meta.modified().map_err(|e| {
            StorageError::ReadFailed(format!("No modified time for {}: {}", path.display(), e))
        })?;
        let last_modified: DateTime<Utc> = modified.into();

        let metadata = match fs::read(Self::meta_path(&path)).await {
            Ok(bytes) => {
                let sidecar: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
                    StorageError::ReadFailed(format!(
                        "Corrupt metadata sidecar for {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                sidecar
                    .get("metadata")
                    .and_then(|m| m.as_object())
                    .map(|m| {
                        m.iter()
                            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                            .collect()
                    })
                    .unwrap_or_default()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to read metadata sidecar for {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(ObjectHead {
            last_modified,
            metadata,
        })
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        self.key_to_path(key)?;
        Ok(self.generate_url(key, expires_in))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn reader_for(data: Vec<u8>) -> Pin<Box<dyn AsyncRead + Send + Unpin>> {
        Box::pin(std::io::Cursor::new(data))
    }

    fn tag_metadata(tags: &[&str]) -> HashMap<String, String> {
        picstore_core::constants::TAG_METADATA_KEYS
            .iter()
            .zip(tags.iter())
            .map(|(slot, tag)| (slot.to_string(), tag.to_string()))
            .collect()
    }

    async fn test_store() -> (tempfile::TempDir, LocalObjectStore) {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://localhost:4321/media".to_string())
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_then_head_returns_metadata() {
        let (_dir, store) = test_store().await;

        let metadata = tag_metadata(&["cat", "outdoor"]);
        store
            .put_stream(
                "u1/a.png",
                "image/png",
                Some(4),
                reader_for(b"data".to_vec()),
                metadata.clone(),
            )
            .await
            .unwrap();

        let head = store.head("u1/a.png").await.unwrap();
        assert_eq!(head.metadata, metadata);
        assert!(head.last_modified <= Utc::now());
    }

    #[tokio::test]
    async fn test_list_keys_isolates_prefixes_and_sorts() {
        let (_dir, store) = test_store().await;

        for key in ["u1/b.png", "u1/a.png", "u2/c.png"] {
            store
                .put_stream(key, "image/png", None, reader_for(b"x".to_vec()), HashMap::new())
                .await
                .unwrap();
        }

        let keys = store.list_keys("u1/").await.unwrap();
        assert_eq!(keys, vec!["u1/a.png".to_string(), "u1/b.png".to_string()]);
    }

    #[tokio::test]
    async fn test_list_keys_skips_metadata_sidecars() {
        let (_dir, store) = test_store().await;

        store
            .put_stream(
                "u1/a.png",
                "image/png",
                None,
                reader_for(b"x".to_vec()),
                tag_metadata(&["cat"]),
            )
            .await
            .unwrap();

        let keys = store.list_keys("u1/").await.unwrap();
        assert_eq!(keys, vec!["u1/a.png".to_string()]);
    }

    #[tokio::test]
    async fn test_list_keys_empty_for_unknown_owner() {
        let (_dir, store) = test_store().await;
        let keys = store.list_keys("nobody/").await.unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let (_dir, store) = test_store().await;

        let result = store.head("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = store.presign_get("/etc/passwd", Duration::from_secs(300)).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = store.list_keys("../other/").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_head_nonexistent_is_not_found() {
        let (_dir, store) = test_store().await;
        let result = store.head("u1/missing.png").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_presign_url_carries_key_and_expiry() {
        let (_dir, store) = test_store().await;
        let url = store
            .presign_get("u1/a.png", Duration::from_secs(300))
            .await
            .unwrap();
        assert!(url.contains("u1/a.png"));
        assert!(url.ends_with("expires=300"));
    }
}
