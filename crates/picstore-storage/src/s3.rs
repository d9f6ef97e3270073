use crate::traits::{ObjectHead, ObjectStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

/// S3 object-store implementation
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a new S3ObjectStore instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO, "https://nyc3.digitaloceanspaces.com" for DigitalOcean Spaces)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let region_provider = RegionProviderChain::first_try(aws_config::Region::new(region));

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config.clone())
            .load()
            .await;

        // Configure S3 client with custom endpoint if provided (for S3-compatible providers)
        let client = if let Some(ref endpoint) = endpoint_url {
            let mut s3_config_builder = aws_sdk_s3::Config::builder()
                .endpoint_url(endpoint)
                .region(config.region().cloned())
                .retry_config(retry_config);
            if let Some(provider) = config.credentials_provider().into_iter().next() {
                s3_config_builder = s3_config_builder.credentials_provider(provider);
            }
            // Path-style addressing is required by MinIO and most S3-compatibles
            s3_config_builder = s3_config_builder.force_path_style(true);

            Client::from_conf(s3_config_builder.build())
        } else {
            Client::new(&config)
        };

        Ok(S3ObjectStore { client, bucket })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_stream(
        &self,
        key: &str,
        content_type: &str,
        content_length: Option<u64>,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
        metadata: HashMap<String, String>,
    ) -> StorageResult<()> {
        let start = std::time::Instant::now();

        // Use multipart upload for files larger than 5MB or of unknown size,
        // otherwise buffer and use a single put
        const MULTIPART_THRESHOLD: u64 = 5 * 1024 * 1024;
        const PART_SIZE: usize = 5 * 1024 * 1024; // minimum S3 part size except for the last part

        let use_multipart = content_length
            .map(|len| len > MULTIPART_THRESHOLD)
            .unwrap_or(true);

        if use_multipart {
            let create_result = self
                .client
                .create_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .content_type(content_type)
                .set_metadata(Some(metadata.clone()))
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        "Failed to create multipart upload"
                    );
                    StorageError::WriteFailed(e.to_string())
                })?;

            let upload_id = create_result.upload_id().ok_or_else(|| {
                StorageError::WriteFailed("No upload ID returned from S3".to_string())
            })?;

            let mut part_number = 1u32;
            let mut parts = Vec::new();
            let mut part_buffer = vec![0u8; PART_SIZE];
            let mut total_size = 0u64;

            loop {
                let mut bytes_in_part = 0usize;
                while bytes_in_part < PART_SIZE {
                    let bytes_read = reader
                        .read(&mut part_buffer[bytes_in_part..])
                        .await
                        .map_err(|e| {
                            StorageError::WriteFailed(format!("Failed to read from stream: {}", e))
                        })?;

                    if bytes_read == 0 {
                        break; // EOF
                    }

                    bytes_in_part += bytes_read;
                }

                if bytes_in_part == 0 {
                    break; // No more data
                }

                total_size += bytes_in_part as u64;

                let part_body = ByteStream::from(Bytes::from(part_buffer[..bytes_in_part].to_vec()));

                let upload_part_result = self
                    .client
                    .upload_part()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(upload_id)
                    .part_number(part_number as i32)
                    .body(part_body)
                    .send()
                    .await
                    .map_err(|e| {
                        tracing::error!(
                            error = %e,
                            bucket = %self.bucket,
                            key = %key,
                            part_number = part_number,
                            "Failed to upload part"
                        );
                        StorageError::WriteFailed(e.to_string())
                    })?;

                let etag = upload_part_result
                    .e_tag()
                    .ok_or_else(|| {
                        StorageError::WriteFailed(format!(
                            "No ETag returned for part {}",
                            part_number
                        ))
                    })?
                    .to_string();

                parts.push(
                    CompletedPart::builder()
                        .part_number(part_number as i32)
                        .e_tag(etag)
                        .build(),
                );

                part_number += 1;

                // If we read less than PART_SIZE, we've reached EOF
                if bytes_in_part < PART_SIZE {
                    break;
                }
            }

            if parts.is_empty() {
                // Empty stream: abort the multipart upload and store an empty object instead
                let _ = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(upload_id)
                    .send()
                    .await;

                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .body(ByteStream::from(Bytes::new()))
                    .content_type(content_type)
                    .set_metadata(Some(metadata))
                    .send()
                    .await
                    .map_err(|e| StorageError::WriteFailed(e.to_string()))?;

                return Ok(());
            }

            self.client
                .complete_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .multipart_upload(
                    CompletedMultipartUpload::builder()
                        .set_parts(Some(parts))
                        .build(),
                )
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        "Failed to complete multipart upload"
                    );
                    StorageError::WriteFailed(e.to_string())
                })?;

            tracing::info!(
                bucket = %self.bucket,
                key = %key,
                size_bytes = total_size,
                parts = part_number - 1,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 multipart stream upload successful"
            );

            Ok(())
        } else {
            // For smaller files, read the stream fully and use a single put
            let mut buffer = Vec::new();
            let mut temp_buf = vec![0u8; 8192];

            loop {
                let bytes_read = reader.read(&mut temp_buf).await.map_err(|e| {
                    StorageError::WriteFailed(format!("Failed to read from stream: {}", e))
                })?;

                if bytes_read == 0 {
                    break; // EOF
                }

                buffer.extend_from_slice(&temp_buf[..bytes_read]);
            }

            let size = buffer.len() as u64;

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(Bytes::from(buffer)))
                .content_type(content_type)
                .set_metadata(Some(metadata))
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        size_bytes = size,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 upload failed"
                    );
                    StorageError::WriteFailed(e.to_string())
                })?;

            tracing::info!(
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload successful"
            );

            Ok(())
        }
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let start = std::time::Instant::now();
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(ref token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    prefix = %prefix,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 list failed"
                );
                StorageError::ReadFailed(e.to_string())
            })?;

            for object in response.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(String::from);
                if continuation_token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        tracing::debug!(
            bucket = %self.bucket,
            prefix = %prefix,
            count = keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 list successful"
        );

        Ok(keys)
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectHead> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err) => match service_err.err() {
                    HeadObjectError::NotFound(_) => StorageError::NotFound(key.to_string()),
                    _ => {
                        tracing::error!(
                            error = %e,
                            bucket = %self.bucket,
                            key = %key,
                            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                            "S3 head failed"
                        );
                        StorageError::ReadFailed(e.to_string())
                    }
                },
                _ => {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 head failed"
                    );
                    StorageError::ReadFailed(e.to_string())
                }
            })?;

        let last_modified = response
            .last_modified()
            .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos()))
            .ok_or_else(|| {
                StorageError::ReadFailed(format!("No last-modified timestamp for {}", key))
            })?;

        let metadata = response.metadata().cloned().unwrap_or_default();

        Ok(ObjectHead {
            last_modified,
            metadata,
        })
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presigning_config = aws_sdk_s3::presigning::PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;

        Ok(presigned_request.uri().to_string())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
