//! Repository descriptors and the index documents built from them

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use vpm_cache::PackageMetadata;

use crate::{Error, Result};

static REPOSITORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^/\s]+/[^/\s]+$")
        .expect("unable to compile repository regex")
});

/// Local input describing one output index and its package repositories
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryDescriptor {
    pub author: String,
    pub name: String,
    pub id: String,
    /// Canonical url of the published index; injected as `repo`
    pub url: String,
    /// Package name -> "owner/repo"
    pub package_repos: IndexMap<String, String>,
}

impl RepositoryDescriptor {
    /// Parse and validate a descriptor from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(json)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Parse and validate a descriptor file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| match e {
            Error::Json(e) => Error::InvalidDescriptor(format!("{}: {}", path.display(), e)),
            other => other,
        })
    }

    /// Check every package repository looks like `owner/repo`
    pub fn validate(&self) -> Result<()> {
        for (package, repository) in &self.package_repos {
            if !is_valid_repository(repository) {
                return Err(Error::InvalidRepository(format!(
                    "{} (package {})",
                    repository, package
                )));
            }
        }
        Ok(())
    }
}

/// `owner/repo` with no whitespace and no `.`/`..` part; anything else is
/// left for the API to reject
pub fn is_valid_repository(repository: &str) -> bool {
    REPOSITORY_RE.is_match(repository)
        && !repository.split('/').any(|part| part == "." || part == "..")
}

/// Versions published for one package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageIndexEntry {
    pub versions: IndexMap<String, PackageMetadata>,
}

/// Consolidated listing written for each descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub author: String,
    pub name: String,
    pub id: String,
    pub url: String,
    pub packages: IndexMap<String, PackageIndexEntry>,
}

impl IndexDocument {
    /// Empty document carrying the descriptor's identity fields
    pub fn from_descriptor(descriptor: &RepositoryDescriptor) -> Self {
        Self {
            author: descriptor.author.clone(),
            name: descriptor.name.clone(),
            id: descriptor.id.clone(),
            url: descriptor.url.clone(),
            packages: IndexMap::new(),
        }
    }

    pub fn version_count(&self) -> usize {
        self.packages.values().map(|p| p.versions.len()).sum()
    }
}

/// Find descriptor files (`*.json`) directly inside `dir`, sorted by path
pub fn scan_descriptors(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.json",
        glob::Pattern::escape(&dir.to_string_lossy()).trim_end_matches('/')
    );

    let mut paths = Vec::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Glob error: {}", e);
            }
        }
    }

    paths.sort();
    Ok(paths)
}
