use std::cell::Cell;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::{
    github::{GithubAsset, GithubRelease},
    traits::ReleaseSource,
    Error, Result,
};

/// In-memory release source that counts asset downloads
#[derive(Default)]
pub struct FakeSource {
    releases: HashMap<String, Vec<GithubRelease>>,
    assets: HashMap<String, Vec<u8>>,
    pub listings: Cell<usize>,
    pub fetches: Cell<usize>,
}

impl FakeSource {
    pub fn with_release(mut self, repository: &str, release: GithubRelease) -> Self {
        self.releases
            .entry(repository.to_string())
            .or_default()
            .push(release);
        self
    }

    pub fn with_asset(mut self, address: &str, body: &str) -> Self {
        self.assets.insert(address.to_string(), body.as_bytes().to_vec());
        self
    }
}

impl ReleaseSource for FakeSource {
    async fn list_releases(&self, repository: &str) -> Result<Vec<GithubRelease>> {
        self.listings.set(self.listings.get() + 1);
        self.releases
            .get(repository)
            .cloned()
            .ok_or_else(|| Error::Api {
                status: 404,
                url: repository.to_string(),
            })
    }

    async fn fetch_asset(&self, address: &str) -> Result<Vec<u8>> {
        self.fetches.set(self.fetches.get() + 1);
        self.assets.get(address).cloned().ok_or_else(|| Error::Api {
            status: 404,
            url: address.to_string(),
        })
    }
}

pub fn asset(repository: &str, id: u32, name: &str, tag: &str) -> GithubAsset {
    GithubAsset {
        name: name.to_string(),
        url: format!("https://api.github.com/repos/{repository}/releases/assets/{id}"),
        browser_download_url: format!(
            "https://github.com/{repository}/releases/download/{tag}/{name}"
        ),
        size: 0,
    }
}

pub fn release(title: &str, assets: Vec<GithubAsset>) -> GithubRelease {
    GithubRelease {
        name: Some(title.to_string()),
        tag_name: title.to_string(),
        prerelease: false,
        assets,
    }
}

/// Log lines captured by [`capture_logs`]
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Captured lines at `level`, e.g. "WARN"
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.split_whitespace().any(|word| word == level))
            .map(str::to_string)
            .collect()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route events on the current thread into a buffer until the guard drops
pub fn capture_logs() -> (DefaultGuard, LogBuffer) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    (tracing::subscriber::set_default(subscriber), buffer)
}
