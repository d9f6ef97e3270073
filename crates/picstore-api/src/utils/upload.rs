//! Multipart upload spooling.
//!
//! Inbound image bytes are spooled to a named temp file so the media index
//! can stream them to storage from a path. Validation (extension,
//! content type, size) happens while spooling; an oversized upload is
//! rejected as soon as the limit is crossed, not after the whole body has
//! been read.

use axum::extract::Multipart;
use picstore_core::AppError;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::error::HttpAppError;
use crate::validation::{UploadLimits, ValidationError};

/// An image spooled to disk plus the request's accompanying tag fields.
pub struct SpooledUpload {
    /// Owns the temp file; dropping this removes the file.
    pub temp_file: NamedTempFile,
    /// Lowercase extension without the dot (e.g. `png`).
    pub extension: String,
    pub content_type: String,
    pub size: u64,
    pub tags: Vec<String>,
}

/// Read a multipart body with a `file` part and any number of `tags` parts.
pub async fn spool_multipart(
    mut multipart: Multipart,
    limits: &UploadLimits,
) -> Result<SpooledUpload, HttpAppError> {
    let mut spooled: Option<(NamedTempFile, String, String, u64)> = None;
    let mut tags = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        HttpAppError(AppError::BadRequest(format!(
            "Malformed multipart body: {}",
            e
        )))
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().map(str::to_string).ok_or_else(|| {
                    HttpAppError(AppError::InvalidInput(
                        "Missing filename on file part".to_string(),
                    ))
                })?;
                let extension = limits.validate_filename(&filename).map_err(HttpAppError::from)?;

                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                limits
                    .validate_content_type(&content_type)
                    .map_err(HttpAppError::from)?;

                let temp_file = NamedTempFile::new().map_err(|e| {
                    HttpAppError(AppError::Internal(format!(
                        "Failed to create temp file: {}",
                        e
                    )))
                })?;
                let mut file = tokio::fs::File::create(temp_file.path()).await.map_err(|e| {
                    HttpAppError(AppError::Internal(format!(
                        "Failed to open temp file: {}",
                        e
                    )))
                })?;

                let mut size: u64 = 0;
                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    HttpAppError(AppError::BadRequest(format!(
                        "Failed to read file part: {}",
                        e
                    )))
                })? {
                    size += chunk.len() as u64;
                    if size > limits.max_file_size {
                        return Err(ValidationError::FileTooLarge {
                            size,
                            max: limits.max_file_size,
                        }
                        .into());
                    }
                    file.write_all(&chunk).await.map_err(|e| {
                        HttpAppError(AppError::Internal(format!(
                            "Failed to write temp file: {}",
                            e
                        )))
                    })?;
                }
                file.flush().await.map_err(|e| {
                    HttpAppError(AppError::Internal(format!(
                        "Failed to flush temp file: {}",
                        e
                    )))
                })?;

                spooled = Some((temp_file, extension, content_type, size));
            }
            Some("tags") => {
                let tag = field.text().await.map_err(|e| {
                    HttpAppError(AppError::BadRequest(format!(
                        "Failed to read tags part: {}",
                        e
                    )))
                })?;
                let tag = tag.trim().to_string();
                if !tag.is_empty() {
                    tags.push(tag);
                }
            }
            _ => {
                // Unknown parts are ignored
            }
        }
    }

    let (temp_file, extension, content_type, size) = spooled.ok_or_else(|| {
        HttpAppError(AppError::InvalidInput("Missing file part".to_string()))
    })?;
    limits.validate_size(size).map_err(HttpAppError::from)?;

    Ok(SpooledUpload {
        temp_file,
        extension,
        content_type,
        size,
        tags,
    })
}
