//! vpm-cache: Durable metadata cache for VPM package indexes
//!
//! This crate provides:
//! - File-based storage keyed by the path component of a remote address
//! - Fetch-on-miss with `url`/`repo` annotation of package metadata
//! - Listing, statistics and explicit invalidation of cached entries

pub mod error;
pub mod models;
pub mod store;

pub use error::{Error, Result};
pub use models::*;
pub use store::MetadataCache;
