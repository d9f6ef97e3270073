//! Media index service.
//!
//! Owns the object-store interaction pattern for the whole system:
//!
//! - **Upload**: mint a media id, build the owner-prefixed key, attach tag
//!   metadata, and stream the file to storage in one put.
//! - **Listing**: list an owner's keys, then resolve each key with a paired
//!   metadata fetch + URL signing call (one "resolution unit" per key). Units
//!   for distinct keys run concurrently up to a configured limit; the two
//!   calls inside a unit run concurrently with each other. Aggregation is
//!   all-or-nothing: one failed unit fails the whole listing. Output order
//!   always equals the storage listing order, regardless of completion order.
//! - **Tag filter**: a linear scan over the owner's records; no index exists
//!   beyond the per-object metadata, so tag search is O(owner's objects).
//!
//! Every storage and suggestion call runs under a per-call timeout so a hung
//! backend fails the operation instead of stalling it forever.

use futures::stream::{self, StreamExt, TryStreamExt};
use picstore_core::constants::{SIGNED_URL_EXPIRY_SECS, TAG_METADATA_KEYS};
use picstore_core::models::MediaRecord;
use picstore_services::{TagSuggestError, TagSuggester};
use picstore_storage::{keys, ObjectStore, StorageError};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::time::timeout;
use uuid::Uuid;

/// Media index failures. All are terminal for the call that raised them; the
/// service never retries. `NoImagesFound` and `NoMatchingTag` are expected
/// conditions, distinguishable from transport failures.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Storage write failed: {0}")]
    StorageWrite(#[source] StorageError),

    #[error("Storage read failed: {0}")]
    StorageRead(#[source] StorageError),

    #[error("No images found for owner {owner_id}")]
    NoImagesFound { owner_id: String },

    #[error("No images matching tag {tag}")]
    NoMatchingTag { tag: String },

    #[error("Tag suggestion failed: {0}")]
    TagSuggestion(#[from] TagSuggestError),
}

/// Service implementing upload, listing, tag filtering, and tag suggestion
/// over an object store.
#[derive(Clone)]
pub struct MediaIndexService {
    store: Arc<dyn ObjectStore>,
    suggester: Arc<dyn TagSuggester>,
    fanout_concurrency: usize,
    op_timeout: Duration,
}

impl MediaIndexService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        suggester: Arc<dyn TagSuggester>,
        fanout_concurrency: usize,
        op_timeout: Duration,
    ) -> Self {
        Self {
            store,
            suggester,
            fanout_concurrency: fanout_concurrency.max(1),
            op_timeout,
        }
    }

    /// Store an image from a local file and return the new media id.
    ///
    /// The file is streamed to storage, not buffered. The first 3 tags become
    /// per-object metadata; extras are silently dropped. Any storage failure
    /// surfaces as [`MediaError::StorageWrite`] with the backend's detail;
    /// the caller decides whether to retry.
    pub async fn add_image(
        &self,
        owner_id: &str,
        source_path: &Path,
        extension: &str,
        tags: &[String],
    ) -> Result<String, MediaError> {
        let start = std::time::Instant::now();

        let media_id = Uuid::new_v4();
        let extension = normalize_extension(extension);
        let key = keys::media_key(owner_id, media_id, &extension);
        let metadata = tag_metadata(tags);

        let file = tokio::fs::File::open(source_path)
            .await
            .map_err(|e| MediaError::StorageWrite(StorageError::Io(e)))?;
        let content_length = file
            .metadata()
            .await
            .map_err(|e| MediaError::StorageWrite(StorageError::Io(e)))?
            .len();
        let reader: Pin<Box<dyn AsyncRead + Send + Unpin>> = Box::pin(file);

        self.write_op(
            "put",
            self.store.put_stream(
                &key,
                content_type_for_extension(&extension),
                Some(content_length),
                reader,
                metadata,
            ),
        )
        .await?;

        tracing::info!(
            owner_id = %owner_id,
            key = %key,
            size_bytes = content_length,
            tags = tags.len().min(TAG_METADATA_KEYS.len()),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image stored"
        );

        Ok(media_id.to_string())
    }

    /// List all of one owner's images as query-ready records.
    ///
    /// Fails with [`MediaError::NoImagesFound`] when the owner has no stored
    /// objects; an empty result is never returned.
    pub async fn get_images_by_owner(&self, owner_id: &str) -> Result<Vec<MediaRecord>, MediaError> {
        let start = std::time::Instant::now();

        let prefix = keys::owner_prefix(owner_id);
        let object_keys = self.read_op("list", self.store.list_keys(&prefix)).await?;

        if object_keys.is_empty() {
            return Err(MediaError::NoImagesFound {
                owner_id: owner_id.to_string(),
            });
        }

        // `buffered` keeps at most `fanout_concurrency` units in flight and
        // yields results in input order, so the output matches the listing
        // order no matter when individual units complete. `try_collect`
        // aborts on the first failed unit: all-or-nothing, no partial pages.
        let records: Vec<MediaRecord> =
            stream::iter(object_keys.into_iter().map(|key| self.resolve_record(key)))
                .buffered(self.fanout_concurrency)
                .try_collect()
                .await?;

        tracing::debug!(
            owner_id = %owner_id,
            count = records.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Listing resolved"
        );

        Ok(records)
    }

    /// List one owner's images filtered to an exact, case-sensitive tag match.
    ///
    /// An owner with images but none matching fails with
    /// [`MediaError::NoMatchingTag`]; an owner with no images at all fails
    /// with the underlying [`MediaError::NoImagesFound`].
    pub async fn get_images_by_tag(
        &self,
        owner_id: &str,
        tag: &str,
    ) -> Result<Vec<MediaRecord>, MediaError> {
        let records = self.get_images_by_owner(owner_id).await?;

        let matching: Vec<MediaRecord> = records
            .into_iter()
            .filter(|record| record.tags.iter().any(|t| t == tag))
            .collect();

        if matching.is_empty() {
            return Err(MediaError::NoMatchingTag {
                tag: tag.to_string(),
            });
        }

        Ok(matching)
    }

    /// Ask the suggestion provider for candidate tags for a local image.
    /// The result is passed through untouched; failures are reported verbatim.
    pub async fn suggest_tags(&self, image_path: &Path) -> Result<Vec<String>, MediaError> {
        match timeout(self.op_timeout, self.suggester.suggest(image_path)).await {
            Ok(result) => result.map_err(MediaError::TagSuggestion),
            Err(_) => Err(MediaError::TagSuggestion(TagSuggestError::Io(
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("tag suggestion timed out after {}s", self.op_timeout.as_secs()),
                ),
            ))),
        }
    }

    /// Resolution unit for one key: metadata fetch and URL signing run
    /// concurrently, and the unit is only ready once both have finished.
    async fn resolve_record(&self, key: String) -> Result<MediaRecord, MediaError> {
        let (head, access_url) = tokio::try_join!(
            self.read_op("head", self.store.head(&key)),
            self.read_op(
                "presign",
                self.store
                    .presign_get(&key, Duration::from_secs(SIGNED_URL_EXPIRY_SECS)),
            ),
        )?;

        Ok(MediaRecord {
            id: key,
            last_modified: head.last_modified,
            tags: extract_tags(&head.metadata),
            access_url,
        })
    }

    async fn read_op<T>(
        &self,
        op: &str,
        fut: impl Future<Output = Result<T, StorageError>> + Send,
    ) -> Result<T, MediaError> {
        match timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(MediaError::StorageRead),
            Err(_) => Err(MediaError::StorageRead(StorageError::ReadFailed(format!(
                "{} timed out after {}s",
                op,
                self.op_timeout.as_secs()
            )))),
        }
    }

    async fn write_op<T>(
        &self,
        op: &str,
        fut: impl Future<Output = Result<T, StorageError>> + Send,
    ) -> Result<T, MediaError> {
        match timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(MediaError::StorageWrite),
            Err(_) => Err(MediaError::StorageWrite(StorageError::WriteFailed(format!(
                "{} timed out after {}s",
                op,
                self.op_timeout.as_secs()
            )))),
        }
    }
}

/// Build the fixed-arity tag metadata map from the first 3 tags.
/// Absent slots are omitted, not null-filled.
fn tag_metadata(tags: &[String]) -> HashMap<String, String> {
    TAG_METADATA_KEYS
        .iter()
        .zip(tags.iter())
        .map(|(slot, tag)| (slot.to_string(), tag.clone()))
        .collect()
}

/// Pull tags out of an object's metadata map in slot order.
fn extract_tags(metadata: &HashMap<String, String>) -> Vec<String> {
    TAG_METADATA_KEYS
        .iter()
        .filter_map(|slot| metadata.get(*slot).cloned())
        .collect()
}

fn normalize_extension(extension: &str) -> String {
    let extension = extension.trim().to_lowercase();
    if extension.starts_with('.') {
        extension
    } else {
        format!(".{}", extension)
    }
}

fn content_type_for_extension(extension: &str) -> &'static str {
    match extension {
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use picstore_core::StorageBackend;
    use picstore_storage::ObjectHead;
    use std::io::Write;
    use std::sync::Mutex;
    use tokio::io::AsyncReadExt;

    struct StoredObject {
        key: String,
        last_modified: DateTime<Utc>,
        metadata: HashMap<String, String>,
    }

    /// In-memory object store that preserves insertion order in listings and
    /// records every presign call so tests can assert the expiry argument.
    #[derive(Default)]
    struct MockObjectStore {
        objects: Mutex<Vec<StoredObject>>,
        presign_calls: Mutex<Vec<(String, Duration)>>,
        fail_head_for: Mutex<Option<String>>,
        head_delay: Mutex<Option<Duration>>,
    }

    impl MockObjectStore {
        fn insert_raw(&self, key: &str, metadata: HashMap<String, String>) {
            self.objects.lock().unwrap().push(StoredObject {
                key: key.to_string(),
                last_modified: Utc::now(),
                metadata,
            });
        }

        fn presign_durations(&self) -> Vec<Duration> {
            self.presign_calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, d)| *d)
                .collect()
        }
    }

    #[async_trait]
    impl ObjectStore for MockObjectStore {
        async fn put_stream(
            &self,
            key: &str,
            _content_type: &str,
            _content_length: Option<u64>,
            mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
            metadata: HashMap<String, String>,
        ) -> Result<(), StorageError> {
            let mut sink = Vec::new();
            reader
                .read_to_end(&mut sink)
                .await
                .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
            self.insert_raw(key, metadata);
            Ok(())
        }

        async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            Ok(self
                .objects
                .lock()
                .unwrap()
                .iter()
                .filter(|o| o.key.starts_with(prefix))
                .map(|o| o.key.clone())
                .collect())
        }

        async fn head(&self, key: &str) -> Result<ObjectHead, StorageError> {
            let head_delay = *self.head_delay.lock().unwrap();
            if let Some(delay) = head_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_head_for.lock().unwrap().as_deref() == Some(key) {
                return Err(StorageError::ReadFailed("injected head failure".to_string()));
            }
            self.objects
                .lock()
                .unwrap()
                .iter()
                .find(|o| o.key == key)
                .map(|o| ObjectHead {
                    last_modified: o.last_modified,
                    metadata: o.metadata.clone(),
                })
                .ok_or_else(|| StorageError::NotFound(key.to_string()))
        }

        async fn presign_get(
            &self,
            key: &str,
            expires_in: Duration,
        ) -> Result<String, StorageError> {
            self.presign_calls
                .lock()
                .unwrap()
                .push((key.to_string(), expires_in));
            Ok(format!(
                "https://signed.example/{}?expires={}",
                key,
                expires_in.as_secs()
            ))
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Local
        }
    }

    struct MockSuggester {
        tags: Vec<String>,
    }

    #[async_trait]
    impl TagSuggester for MockSuggester {
        async fn suggest(&self, _image_path: &Path) -> Result<Vec<String>, TagSuggestError> {
            Ok(self.tags.clone())
        }
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn service_with(
        store: Arc<MockObjectStore>,
        op_timeout: Duration,
    ) -> MediaIndexService {
        MediaIndexService::new(
            store,
            Arc::new(MockSuggester {
                tags: tags(&["cat", "whiskers"]),
            }),
            16,
            op_timeout,
        )
    }

    fn service(store: Arc<MockObjectStore>) -> MediaIndexService {
        service_with(store, Duration::from_secs(5))
    }

    fn temp_image() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG\r\n\x1a\nfake image bytes").unwrap();
        file
    }

    #[tokio::test]
    async fn test_upload_then_list_round_trip() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store.clone());
        let image = temp_image();

        let media_id = service
            .add_image("u1", image.path(), ".png", &tags(&["cat", "outdoor", "sunny"]))
            .await
            .unwrap();

        let records = service.get_images_by_owner("u1").await.unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.id, format!("u1/{}.png", media_id));
        assert_eq!(record.tags, tags(&["cat", "outdoor", "sunny"]));
        assert!(!record.access_url.is_empty());
        assert!(record.last_modified <= Utc::now());
    }

    #[tokio::test]
    async fn test_extra_tags_silently_dropped() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store.clone());
        let image = temp_image();

        service
            .add_image(
                "u1",
                image.path(),
                ".png",
                &tags(&["one", "two", "three", "four", "five"]),
            )
            .await
            .unwrap();

        let records = service.get_images_by_owner("u1").await.unwrap();
        assert_eq!(records[0].tags, tags(&["one", "two", "three"]));
    }

    #[tokio::test]
    async fn test_extension_without_dot_is_normalized() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store.clone());
        let image = temp_image();

        let media_id = service
            .add_image("u1", image.path(), "PNG", &[])
            .await
            .unwrap();

        let records = service.get_images_by_owner("u1").await.unwrap();
        assert_eq!(records[0].id, format!("u1/{}.png", media_id));
    }

    #[tokio::test]
    async fn test_empty_listing_is_no_images_found() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store);

        let result = service.get_images_by_owner("u2").await;
        assert!(matches!(
            result,
            Err(MediaError::NoImagesFound { ref owner_id }) if owner_id == "u2"
        ));
    }

    #[tokio::test]
    async fn test_media_ids_never_collide() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store.clone());
        let image = temp_image();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..10 {
            let media_id = service
                .add_image("u1", image.path(), ".png", &tags(&["cat"]))
                .await
                .unwrap();
            assert!(seen.insert(media_id));
        }
    }

    #[tokio::test]
    async fn test_presign_expiry_is_exactly_300_seconds() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store.clone());
        let image = temp_image();

        service
            .add_image("u1", image.path(), ".png", &tags(&["cat"]))
            .await
            .unwrap();
        service.get_images_by_owner("u1").await.unwrap();

        let durations = store.presign_durations();
        assert!(!durations.is_empty());
        assert!(durations.iter().all(|d| *d == Duration::from_secs(300)));
    }

    #[tokio::test]
    async fn test_listing_preserves_backend_order() {
        let store = Arc::new(MockObjectStore::default());
        // Backend order is deliberately not lexicographic
        store.insert_raw("u1/zzz.png", HashMap::new());
        store.insert_raw("u1/aaa.png", HashMap::new());
        store.insert_raw("u1/mmm.png", HashMap::new());

        let service = service(store);
        let records = service.get_images_by_owner("u1").await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["u1/zzz.png", "u1/aaa.png", "u1/mmm.png"]);
    }

    #[tokio::test]
    async fn test_listing_is_owner_scoped() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store.clone());
        let image = temp_image();

        service
            .add_image("u1", image.path(), ".png", &tags(&["cat"]))
            .await
            .unwrap();
        service
            .add_image("u10", image.path(), ".png", &tags(&["dog"]))
            .await
            .unwrap();

        let records = service.get_images_by_owner("u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tags, tags(&["cat"]));
    }

    #[tokio::test]
    async fn test_one_failed_unit_poisons_the_listing() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store.clone());
        let image = temp_image();

        service
            .add_image("u1", image.path(), ".png", &tags(&["cat"]))
            .await
            .unwrap();
        service
            .add_image("u1", image.path(), ".png", &tags(&["dog"]))
            .await
            .unwrap();

        let poisoned_key = store.objects.lock().unwrap()[1].key.clone();
        *store.fail_head_for.lock().unwrap() = Some(poisoned_key);

        let result = service.get_images_by_owner("u1").await;
        assert!(matches!(result, Err(MediaError::StorageRead(_))));
    }

    #[tokio::test]
    async fn test_by_tag_filters_concrete_scenario() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store.clone());
        let image = temp_image();

        service
            .add_image("u1", image.path(), ".png", &tags(&["cat", "outdoor", "sunny"]))
            .await
            .unwrap();

        let all = service.get_images_by_owner("u1").await.unwrap();
        let by_cat = service.get_images_by_tag("u1", "cat").await.unwrap();
        assert_eq!(by_cat, all);

        let result = service.get_images_by_tag("u1", "dog").await;
        assert!(matches!(
            result,
            Err(MediaError::NoMatchingTag { ref tag }) if tag == "dog"
        ));
    }

    #[tokio::test]
    async fn test_by_tag_match_is_case_sensitive() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store.clone());
        let image = temp_image();

        service
            .add_image("u1", image.path(), ".png", &tags(&["cat"]))
            .await
            .unwrap();

        let result = service.get_images_by_tag("u1", "Cat").await;
        assert!(matches!(result, Err(MediaError::NoMatchingTag { .. })));
    }

    #[tokio::test]
    async fn test_by_tag_returns_subset() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store.clone());
        let image = temp_image();

        service
            .add_image("u1", image.path(), ".png", &tags(&["cat", "indoor"]))
            .await
            .unwrap();
        service
            .add_image("u1", image.path(), ".png", &tags(&["dog", "indoor"]))
            .await
            .unwrap();

        let indoor = service.get_images_by_tag("u1", "indoor").await.unwrap();
        assert_eq!(indoor.len(), 2);

        let cats = service.get_images_by_tag("u1", "cat").await.unwrap();
        assert_eq!(cats.len(), 1);
        assert!(cats[0].tags.contains(&"cat".to_string()));
    }

    #[tokio::test]
    async fn test_by_tag_on_empty_owner_surfaces_no_images_found() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store);

        let result = service.get_images_by_tag("u2", "cat").await;
        assert!(matches!(result, Err(MediaError::NoImagesFound { .. })));
    }

    #[tokio::test]
    async fn test_slow_head_call_times_out() {
        let store = Arc::new(MockObjectStore::default());
        store.insert_raw("u1/a.png", HashMap::new());
        *store.head_delay.lock().unwrap() = Some(Duration::from_secs(5));

        let service = service_with(store, Duration::from_millis(100));

        let result = service.get_images_by_owner("u1").await;
        match result {
            Err(MediaError::StorageRead(StorageError::ReadFailed(msg))) => {
                assert!(msg.contains("timed out"));
            }
            other => panic!("Expected timeout, got {:?}", other.map(|r| r.len())),
        }
    }

    #[tokio::test]
    async fn test_suggest_tags_passthrough() {
        let store = Arc::new(MockObjectStore::default());
        let service = service(store);
        let image = temp_image();

        let suggested = service.suggest_tags(image.path()).await.unwrap();
        assert_eq!(suggested, tags(&["cat", "whiskers"]));
    }

    #[test]
    fn test_tag_metadata_uses_slot_names() {
        let metadata = tag_metadata(&tags(&["cat", "outdoor"]));
        assert_eq!(metadata.get("tag_zero").map(String::as_str), Some("cat"));
        assert_eq!(metadata.get("tag_one").map(String::as_str), Some("outdoor"));
        assert!(!metadata.contains_key("tag_two"));
    }

    #[test]
    fn test_extract_tags_respects_slot_order() {
        let mut metadata = HashMap::new();
        metadata.insert("tag_two".to_string(), "c".to_string());
        metadata.insert("tag_zero".to_string(), "a".to_string());
        metadata.insert("tag_one".to_string(), "b".to_string());
        assert_eq!(extract_tags(&metadata), tags(&["a", "b", "c"]));
    }
}
