//! The media index: upload partitioning, listing fan-out, and tag filtering
//! over the object store.

pub mod service;

pub use service::{MediaError, MediaIndexService};
