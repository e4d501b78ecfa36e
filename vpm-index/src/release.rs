//! Release scanning
//!
//! Walks the releases of a package repository, picks the `package.json`
//! and `.zip` assets of each one and resolves the metadata through the cache.

use indexmap::IndexMap;
use tracing::{info, warn};
use vpm_cache::{Annotation, CacheOutcome, MetadataCache, PackageMetadata};

use crate::{
    github::{GithubAsset, GithubRelease},
    traits::ReleaseSource,
    Error, Result,
};

pub const METADATA_ASSET: &str = "package.json";
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// Assets of interest on a single release
#[derive(Debug, Clone, Copy)]
pub struct ReleaseAssets<'a> {
    pub metadata: Option<&'a GithubAsset>,
    pub archive: Option<&'a GithubAsset>,
}

/// Locate the asset named exactly `package.json` and the first `.zip` asset
pub fn select_assets(release: &GithubRelease) -> ReleaseAssets<'_> {
    ReleaseAssets {
        metadata: release.assets.iter().find(|a| a.name == METADATA_ASSET),
        archive: release
            .assets
            .iter()
            .find(|a| a.name.ends_with(ARCHIVE_EXTENSION)),
    }
}

/// Map release titles of `repository` to their annotated package metadata.
///
/// Releases without a `package.json` asset are skipped with a warning.
/// Order follows the release listing.
pub async fn scan_releases<S: ReleaseSource>(
    source: &S,
    cache: &MetadataCache,
    repository: &str,
    repo_url: &str,
) -> Result<IndexMap<String, PackageMetadata>> {
    let releases = source.list_releases(repository).await?;
    let mut versions = IndexMap::new();

    for release in &releases {
        let title = release.title();
        let assets = select_assets(release);

        let Some(metadata_asset) = assets.metadata else {
            warn!("package.json is not found in {}:{}", repository, title);
            continue;
        };

        let archive = assets.archive.ok_or_else(|| Error::MissingArchive {
            repository: repository.to_string(),
            release: title.to_string(),
        })?;

        let annotation = Annotation {
            url: &archive.browser_download_url,
            repo: repo_url,
        };
        let lookup = cache
            .get_or_fetch(&metadata_asset.url, annotation, move || {
                source.fetch_asset(&metadata_asset.url)
            })
            .await?;

        match lookup.outcome {
            CacheOutcome::Hit => {
                info!("Loaded cached package.json for {}:{}", repository, title)
            }
            CacheOutcome::Miss => {
                info!("Downloaded package.json for {}:{}", repository, title)
            }
        }

        versions.insert(title.to_string(), lookup.metadata);
    }

    Ok(versions)
}
