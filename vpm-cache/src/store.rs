//! File-based metadata cache
//!
//! Entries live at `<root>/<address path>`, so the asset address
//! `https://api.github.com/repos/o/r/releases/assets/42` is stored at
//! `<root>/repos/o/r/releases/assets/42`. Entries are never revalidated.

use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::models::*;

/// Durable cache of annotated package metadata
#[derive(Debug, Clone)]
pub struct MetadataCache {
    root: PathBuf,
}

impl MetadataCache {
    /// Open or create a cache rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive the on-disk location for a remote address
    pub fn path_for(&self, address: &str) -> Result<PathBuf> {
        let url = Url::parse(address).map_err(|_| Error::InvalidAddress(address.to_string()))?;

        let mut path = self.root.clone();
        let mut pushed = false;
        for segment in url.path().split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(Error::InvalidAddress(address.to_string()));
            }
            path.push(segment);
            pushed = true;
        }

        if !pushed {
            return Err(Error::InvalidAddress(address.to_string()));
        }
        Ok(path)
    }

    pub fn contains(&self, address: &str) -> Result<bool> {
        Ok(self.path_for(address)?.is_file())
    }

    /// Read a cached entry without fetching
    pub fn get(&self, address: &str) -> Result<Option<PackageMetadata>> {
        let path = self.path_for(address)?;
        if !path.is_file() {
            return Ok(None);
        }
        read_entry(&path).map(Some)
    }

    /// Return the cached entry for `address`, or run `fetch`, annotate the
    /// body and persist it.
    ///
    /// A present entry is trusted unconditionally: it is neither refetched nor
    /// re-annotated. It must still parse as a JSON object, which every entry
    /// written here is; anything else placed at that path by hand fails with
    /// [`Error::NotAnObject`] or [`Error::Json`]. On any failure nothing is
    /// written for the address.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        address: &str,
        annotation: Annotation<'_>,
        fetch: F,
    ) -> std::result::Result<Lookup, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Vec<u8>, E>>,
        E: From<Error>,
    {
        let path = self.path_for(address)?;

        if path.is_file() {
            debug!("Cache hit for {} at {:?}", address, path);
            return Ok(Lookup {
                outcome: CacheOutcome::Hit,
                metadata: read_entry(&path)?,
            });
        }

        debug!("Cache miss for {}", address);
        let body = fetch().await?;
        let mut metadata = parse_object(&body, address)?;
        annotation.apply(&mut metadata);
        write_entry(&path, &metadata)?;

        Ok(Lookup {
            outcome: CacheOutcome::Miss,
            metadata,
        })
    }

    /// Delete the entry for `address`. Returns whether it existed.
    pub fn remove(&self, address: &str) -> Result<bool> {
        let path = self.path_for(address)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List every cached entry, sorted by key.
    ///
    /// Only files holding an annotated metadata object count as entries, so
    /// unrelated files under the root are never listed or removed.
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let root_str = glob::Pattern::escape(&self.root.to_string_lossy());
        let pattern = format!("{}/**/*", root_str.trim_end_matches('/'));
        debug!("Scanning cache with {}", pattern);

        let mut entries = Vec::new();
        for path in glob::glob(&pattern)?.filter_map(|p| p.ok()) {
            if !path.is_file() || is_temp_file(&path) || !is_cache_entry(&path) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let size = std::fs::metadata(&path)?.len();
            entries.push(CacheEntry { key, path, size });
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.entries()?;
        Ok(CacheStats {
            entries: entries.len(),
            total_bytes: entries.iter().map(|e| e.size).sum(),
        })
    }

    /// Remove every entry and the directories left empty by it. Other files
    /// under the root are kept. Returns how many entries were removed.
    pub fn clear(&self) -> Result<usize> {
        let entries = self.entries()?;
        for entry in &entries {
            std::fs::remove_file(&entry.path)?;
            self.prune_empty_dirs(&entry.path);
        }
        Ok(entries.len())
    }

    /// Remove empty parents of `path`, stopping below the root
    fn prune_empty_dirs(&self, path: &Path) {
        let mut dir = path.parent();
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            // fails on the first non-empty directory
            if std::fs::remove_dir(current).is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with(".tmp"))
        .unwrap_or(false)
}

/// Whether `path` holds a metadata object carrying the injected fields
fn is_cache_entry(path: &Path) -> bool {
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    match serde_json::from_reader::<_, Value>(std::io::BufReader::new(file)) {
        Ok(Value::Object(map)) => map.contains_key("url") && map.contains_key("repo"),
        _ => false,
    }
}

fn parse_object(bytes: &[u8], origin: &str) -> Result<PackageMetadata> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::NotAnObject(origin.to_string())),
    }
}

fn read_entry(path: &Path) -> Result<PackageMetadata> {
    let content = std::fs::read(path)?;
    parse_object(&content, &path.to_string_lossy())
}

fn write_entry(path: &Path, metadata: &PackageMetadata) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::InvalidAddress(path.to_string_lossy().to_string()))?;
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    serde_json::to_writer(&mut tmp, metadata)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const ADDRESS: &str = "https://api.github.com/repos/owner/pkg/releases/assets/42";

    fn annotation() -> Annotation<'static> {
        Annotation {
            url: "https://github.com/owner/pkg/releases/download/1.0.0/pkg-1.0.0.zip",
            repo: "https://vpm.example/index.json",
        }
    }

    #[test]
    fn test_path_for_strips_scheme_and_host() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::open(dir.path()).unwrap();

        let path = cache.path_for(ADDRESS).unwrap();
        assert_eq!(
            path,
            dir.path().join("repos/owner/pkg/releases/assets/42")
        );
    }

    #[test]
    fn test_path_for_rejects_empty_path() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::open(dir.path()).unwrap();

        assert!(matches!(
            cache.path_for("https://api.github.com/"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            cache.path_for("not a url"),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_miss_annotates_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::open(dir.path()).unwrap();

        let lookup = cache
            .get_or_fetch(ADDRESS, annotation(), || async {
                Ok::<_, Error>(br#"{"name":"pkg","version":"1.0.0"}"#.to_vec())
            })
            .await
            .unwrap();

        assert_eq!(lookup.outcome, CacheOutcome::Miss);
        assert_eq!(lookup.metadata["name"], "pkg");
        assert_eq!(lookup.metadata["url"], annotation().url);
        assert_eq!(lookup.metadata["repo"], annotation().repo);

        let stored = cache.get(ADDRESS).unwrap().unwrap();
        assert_eq!(stored, lookup.metadata);
        let keys: Vec<_> = stored.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "version", "url", "repo"]);
    }

    #[tokio::test]
    async fn test_hit_skips_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::open(dir.path()).unwrap();
        let calls = Cell::new(0);
        let counter = &calls;

        for _ in 0..2 {
            cache
                .get_or_fetch(ADDRESS, annotation(), || async move {
                    counter.set(counter.get() + 1);
                    Ok::<_, Error>(br#"{"name":"pkg"}"#.to_vec())
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_hit_is_not_reannotated() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::open(dir.path()).unwrap();

        cache
            .get_or_fetch(ADDRESS, annotation(), || async {
                Ok::<_, Error>(br#"{"name":"pkg"}"#.to_vec())
            })
            .await
            .unwrap();

        let other = Annotation {
            url: "https://elsewhere.example/pkg.zip",
            repo: "https://other.example/index.json",
        };
        let lookup = cache
            .get_or_fetch(ADDRESS, other, || async {
                Ok::<_, Error>(b"{}".to_vec())
            })
            .await
            .unwrap();

        assert_eq!(lookup.outcome, CacheOutcome::Hit);
        assert_eq!(lookup.metadata["repo"], annotation().repo);
    }

    #[tokio::test]
    async fn test_invalid_body_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::open(dir.path()).unwrap();

        let result = cache
            .get_or_fetch(ADDRESS, annotation(), || async {
                Ok::<_, Error>(b"Not Found".to_vec())
            })
            .await;
        assert!(matches!(result, Err(Error::Json(_))));

        let result = cache
            .get_or_fetch(ADDRESS, annotation(), || async {
                Ok::<_, Error>(b"[1, 2]".to_vec())
            })
            .await;
        assert!(matches!(result, Err(Error::NotAnObject(_))));

        assert!(!cache.contains(ADDRESS).unwrap());
        assert_eq!(cache.stats().unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_entries_remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::open(dir.path()).unwrap();
        let second = "https://api.github.com/repos/owner/other/releases/assets/7";

        for address in [ADDRESS, second] {
            cache
                .get_or_fetch(address, annotation(), || async {
                    Ok::<_, Error>(b"{}".to_vec())
                })
                .await
                .unwrap();
        }

        let entries = cache.entries().unwrap();
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "repos/owner/other/releases/assets/7",
                "repos/owner/pkg/releases/assets/42",
            ]
        );
        assert!(cache.stats().unwrap().total_bytes > 0);

        assert!(cache.remove(second).unwrap());
        assert!(!cache.remove(second).unwrap());
        assert_eq!(cache.stats().unwrap().entries, 1);

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(cache.entries().unwrap().is_empty());
        assert!(cache.root().is_dir());
    }

    #[tokio::test]
    async fn test_hand_placed_non_object_entry_is_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::open(dir.path()).unwrap();
        let path = cache.path_for(ADDRESS).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2]").unwrap();
        let calls = Cell::new(0);
        let counter = &calls;

        let result = cache
            .get_or_fetch(ADDRESS, annotation(), || async move {
                counter.set(counter.get() + 1);
                Ok::<_, Error>(br#"{"name":"pkg"}"#.to_vec())
            })
            .await;

        assert!(matches!(result, Err(Error::NotAnObject(_))));
        assert_eq!(calls.get(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1, 2]");
    }

    #[tokio::test]
    async fn test_clear_keeps_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("README.md"), "# notes").unwrap();
        std::fs::create_dir_all(dir.path().join("repos/owner")).unwrap();
        std::fs::write(dir.path().join("repos/owner/config.json"), r#"{"a":1}"#).unwrap();

        cache
            .get_or_fetch(ADDRESS, annotation(), || async {
                Ok::<_, Error>(br#"{"name":"pkg"}"#.to_vec())
            })
            .await
            .unwrap();
        assert_eq!(cache.stats().unwrap().entries, 1);

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(!cache.contains(ADDRESS).unwrap());
        assert!(dir.path().join("README.md").is_file());
        assert!(dir.path().join("repos/owner/config.json").is_file());
        assert!(!dir.path().join("repos/owner/pkg").exists());
    }
}
