//! Picstore Storage Library
//!
//! This crate provides the object-store abstraction and implementations for
//! Picstore. It includes the ObjectStore trait and backends for S3 and the
//! local filesystem.
//!
//! # Storage key format
//!
//! Storage keys are owner-scoped: `{owner_id}/{media_id}{extension}`, where
//! `media_id` is a UUID minted at upload time. The key prefix is the only
//! thing partitioning one owner's media from another's; the backend namespace
//! itself is flat. Keys must not contain `..` or a leading `/`. Key
//! generation is centralized in the `keys` module so all backends stay
//! consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_object_store;
#[cfg(feature = "storage-local")]
pub use local::LocalObjectStore;
pub use picstore_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3ObjectStore;
pub use traits::{ObjectHead, ObjectStore, StorageError, StorageResult};
