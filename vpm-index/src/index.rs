//! Index building
//!
//! Turns a repository descriptor into an [`IndexDocument`] and writes it to
//! `<output_dir>/<descriptor stem>.json`.

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use vpm_cache::MetadataCache;

use crate::{
    descriptor::{scan_descriptors, IndexDocument, PackageIndexEntry, RepositoryDescriptor},
    release::scan_releases,
    traits::ReleaseSource,
    Error, Result,
};

/// Scan every package repository of `descriptor` and assemble the document
pub async fn build_index<S: ReleaseSource>(
    source: &S,
    cache: &MetadataCache,
    descriptor: &RepositoryDescriptor,
) -> Result<IndexDocument> {
    let mut document = IndexDocument::from_descriptor(descriptor);

    for (package_name, repository) in &descriptor.package_repos {
        info!("Scanning {} ({})", package_name, repository);
        let versions = scan_releases(source, cache, repository, &descriptor.url).await?;
        document
            .packages
            .insert(package_name.clone(), PackageIndexEntry { versions });
    }

    Ok(document)
}

/// Destination of the index built from `descriptor_path`
pub fn output_path(descriptor_path: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = descriptor_path.file_stem().ok_or_else(|| {
        Error::InvalidDescriptor(format!("no file name in {}", descriptor_path.display()))
    })?;

    let mut file_name = stem.to_os_string();
    file_name.push(".json");
    Ok(output_dir.join(file_name))
}

/// Serialize `document` to `path`, replacing any previous content
pub fn write_index(document: &IndexDocument, path: &Path, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(document)?
    } else {
        serde_json::to_string(document)?
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(json.as_bytes())?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Read one descriptor file, build its index and write it. Returns the
/// written path.
pub async fn process_descriptor<S: ReleaseSource>(
    source: &S,
    cache: &MetadataCache,
    descriptor_path: &Path,
    output_dir: &Path,
    pretty: bool,
) -> Result<PathBuf> {
    info!("Processing {:?}", descriptor_path);

    let descriptor = RepositoryDescriptor::from_file(descriptor_path)?;
    let destination = output_path(descriptor_path, output_dir)?;
    let document = build_index(source, cache, &descriptor).await?;
    write_index(&document, &destination, pretty)?;

    info!(
        "Generated index for {} packages ({} versions) -> {:?}",
        document.packages.len(),
        document.version_count(),
        destination
    );
    Ok(destination)
}

/// A descriptor that could not be processed
#[derive(Debug)]
pub struct DescriptorFailure {
    pub path: PathBuf,
    pub error: Error,
}

/// Outcome of processing a directory of descriptors
#[derive(Debug, Default)]
pub struct GenerateReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<DescriptorFailure>,
}

impl GenerateReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.failed.len()
    }
}

/// Process every descriptor in `repos_dir`.
///
/// A failing descriptor is logged and recorded; no output is written for it
/// and the remaining descriptors are still processed.
pub async fn generate<S: ReleaseSource>(
    source: &S,
    cache: &MetadataCache,
    repos_dir: &Path,
    output_dir: &Path,
    pretty: bool,
) -> Result<GenerateReport> {
    let descriptors = scan_descriptors(repos_dir)?;
    info!("Found {} descriptors in {:?}", descriptors.len(), repos_dir);

    let mut report = GenerateReport::default();
    for path in descriptors {
        match process_descriptor(source, cache, &path, output_dir, pretty).await {
            Ok(written) => report.written.push(written),
            Err(e) => {
                error!("Failed to process {:?}: {}", path, e);
                report.failed.push(DescriptorFailure { path, error: e });
            }
        }
    }

    Ok(report)
}
