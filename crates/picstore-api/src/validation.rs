//! Upload request validation.
//!
//! Request-layer policy for inbound uploads: size limit, extension and
//! content-type allow-lists, and the tag-count limit. The tag policy is
//! "up to 3": more than 3 tags is rejected here with a 400 rather than
//! silently truncated at the HTTP boundary.

use picstore_core::constants::MAX_TAGS_PER_IMAGE;
use picstore_core::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid extension: {extension}")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type}")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Missing file extension: {0}")]
    MissingExtension(String),

    #[error("File is empty")]
    EmptyFile,

    #[error("Too many tags: {count} (max {max})")]
    TooManyTags { count: usize, max: usize },
}

/// Size limits and allow-lists applied to image uploads.
#[derive(Clone, Debug)]
pub struct UploadLimits {
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
}

impl UploadLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_file_size: config.max_file_size_bytes() as u64,
            allowed_extensions: config.allowed_extensions().to_vec(),
            allowed_content_types: config.allowed_content_types().to_vec(),
        }
    }

    /// Extract and validate the lowercase extension (without dot) from a filename.
    pub fn validate_filename(&self, filename: &str) -> Result<String, ValidationError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(stem, ext)| (stem, ext.to_lowercase()))
            .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
            .map(|(_, ext)| ext)
            .ok_or_else(|| ValidationError::MissingExtension(filename.to_string()))?;

        if !self.allowed_extensions.iter().any(|e| e == &extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();
        if !self.allowed_content_types.iter().any(|c| c == &normalized) {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }
        Ok(())
    }

    pub fn validate_size(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }
}

pub fn validate_tag_count(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS_PER_IMAGE {
        return Err(ValidationError::TooManyTags {
            count: tags.len(),
            max: MAX_TAGS_PER_IMAGE,
        });
    }
    Ok(())
}
