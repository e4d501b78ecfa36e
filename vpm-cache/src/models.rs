//! Data models for the metadata cache

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// A `package.json` object as published by the package author, plus the
/// injected `url` and `repo` fields.
pub type PackageMetadata = Map<String, Value>;

/// Fields injected into freshly downloaded package metadata
#[derive(Debug, Clone, Copy)]
pub struct Annotation<'a> {
    /// Direct download address of the package archive
    pub url: &'a str,
    /// Canonical url of the owning VPM repository
    pub repo: &'a str,
}

impl Annotation<'_> {
    /// Insert `url` and `repo` into a metadata object, replacing any
    /// values the author published under the same keys.
    pub fn apply(&self, metadata: &mut PackageMetadata) {
        metadata.insert("url".to_string(), Value::String(self.url.to_string()));
        metadata.insert("repo".to_string(), Value::String(self.repo.to_string()));
    }
}

/// Whether a lookup was served from disk or required a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOutcome {
    Hit,
    Miss,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
        }
    }
}

impl std::fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of [`MetadataCache::get_or_fetch`](crate::MetadataCache::get_or_fetch)
#[derive(Debug, Clone)]
pub struct Lookup {
    pub outcome: CacheOutcome,
    pub metadata: PackageMetadata,
}

/// A single file in the cache directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Path relative to the cache root, `/`-separated (the address path)
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Aggregate statistics for the cache directory
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}
