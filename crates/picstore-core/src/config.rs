//! Configuration module
//!
//! Provides the application configuration loaded from environment variables
//! (with `.env` support via dotenvy), plus fail-fast validation run at
//! startup.

use std::env;

use crate::storage_types::StorageBackend;

// Common constants
const JWT_EXPIRY_HOURS: i64 = 24;
const MAX_FILE_SIZE_MB: usize = 10;
const LIST_FANOUT_CONCURRENCY: usize = 16;
const STORAGE_OP_TIMEOUT_SECS: u64 = 30;
const VISION_MIN_SCORE: f32 = 0.5;
const VISION_MAX_TAGS: usize = 5;

/// Application configuration fields.
#[derive(Clone, Debug)]
pub struct PicstoreConfig {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, Spaces, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Upload validation configuration
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    // Listing fan-out configuration
    pub list_fanout_concurrency: usize,
    pub storage_op_timeout_secs: u64,
    // Tag suggestion configuration
    pub vision_api_key: Option<String>,
    pub vision_min_score: f32,
    pub vision_max_tags: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<PicstoreConfig>);

impl Config {
    fn inner(&self) -> &PicstoreConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = PicstoreConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate(self.is_production())
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().cors_origins
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.inner().jwt_expiry_hours
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.inner().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.inner().max_file_size_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.inner().allowed_extensions
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.inner().allowed_content_types
    }

    pub fn list_fanout_concurrency(&self) -> usize {
        self.inner().list_fanout_concurrency
    }

    pub fn storage_op_timeout_secs(&self) -> u64 {
        self.inner().storage_op_timeout_secs
    }

    pub fn vision_api_key(&self) -> Option<&str> {
        self.inner().vision_api_key.as_deref()
    }

    pub fn vision_min_score(&self) -> f32 {
        self.inner().vision_min_score
    }

    pub fn vision_max_tags(&self) -> usize {
        self.inner().vision_max_tags
    }
}

impl PicstoreConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_FILE_SIZE_MB);

        let allowed_extensions = env::var("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| "jpg,jpeg,png,gif,webp".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| "image/jpeg,image/png,image/gif,image/webp".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?;

        Ok(PicstoreConfig {
            server_port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4321),
            environment,
            cors_origins,
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(JWT_EXPIRY_HOURS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            allowed_extensions,
            allowed_content_types,
            list_fanout_concurrency: env::var("LIST_FANOUT_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(LIST_FANOUT_CONCURRENCY),
            storage_op_timeout_secs: env::var("STORAGE_OP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(STORAGE_OP_TIMEOUT_SECS),
            vision_api_key: env::var("VISION_API_KEY").ok(),
            vision_min_score: env::var("VISION_MIN_SCORE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(VISION_MIN_SCORE),
            vision_max_tags: env::var("VISION_MAX_TAGS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(VISION_MAX_TAGS),
        })
    }

    /// Fail-fast validation of the loaded configuration.
    pub fn validate(&self, is_production: bool) -> Result<(), anyhow::Error> {
        if self.jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        if is_production && self.jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters in production");
        }
        if self.list_fanout_concurrency == 0 {
            anyhow::bail!("LIST_FANOUT_CONCURRENCY must be at least 1");
        }
        if self.storage_op_timeout_secs == 0 {
            anyhow::bail!("STORAGE_OP_TIMEOUT_SECS must be at least 1");
        }
        match self.storage_backend {
            Some(StorageBackend::S3) => {
                if self.s3_bucket.is_none() {
                    anyhow::bail!("S3_BUCKET must be set when STORAGE_BACKEND=s3");
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    anyhow::bail!("S3_REGION or AWS_REGION must be set when STORAGE_BACKEND=s3");
                }
            }
            Some(StorageBackend::Local) => {
                if self.local_storage_path.is_none() {
                    anyhow::bail!("LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND=local");
                }
                if self.local_storage_base_url.is_none() {
                    anyhow::bail!("LOCAL_STORAGE_BASE_URL must be set when STORAGE_BACKEND=local");
                }
            }
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> PicstoreConfig {
        PicstoreConfig {
            server_port: 4321,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 24,
            storage_backend: None,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: None,
            local_storage_base_url: None,
            max_file_size_bytes: 10 * 1024 * 1024,
            allowed_extensions: vec!["png".to_string(), "jpg".to_string()],
            allowed_content_types: vec!["image/png".to_string(), "image/jpeg".to_string()],
            list_fanout_concurrency: 16,
            storage_op_timeout_secs: 30,
            vision_api_key: None,
            vision_min_score: 0.5,
            vision_max_tags: 5,
        }
    }

    #[test]
    fn test_validate_accepts_dev_defaults() {
        assert!(base_config().validate(false).is_ok());
    }

    #[test]
    fn test_validate_rejects_short_secret_in_production() {
        let config = base_config();
        assert!(config.validate(true).is_err());
    }

    #[test]
    fn test_validate_rejects_s3_without_bucket() {
        let mut config = base_config();
        config.storage_backend = Some(StorageBackend::S3);
        config.s3_region = Some("us-east-1".to_string());
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn test_validate_rejects_local_without_path() {
        let mut config = base_config();
        config.storage_backend = Some(StorageBackend::Local);
        config.local_storage_base_url = Some("http://localhost:4321/media".to_string());
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_fanout() {
        let mut config = base_config();
        config.list_fanout_concurrency = 0;
        assert!(config.validate(false).is_err());
    }
}
