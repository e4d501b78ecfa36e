//! vpm-index: Static VPM package index generator
//!
//! This crate provides tools for:
//! - Listing GitHub releases and locating `package.json` / `.zip` assets
//! - Caching downloaded package metadata by asset address
//! - Parsing repository descriptors
//! - Building and writing the consolidated package index

pub mod descriptor;
pub mod error;
pub mod github;
pub mod index;
pub mod release;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_utils;

pub use descriptor::{IndexDocument, PackageIndexEntry, RepositoryDescriptor};
pub use error::{Error, Result};
pub use github::{GithubAsset, GithubClient, GithubRelease};
pub use index::{build_index, generate, process_descriptor, GenerateReport};
pub use release::scan_releases;
pub use traits::ReleaseSource;
