use crate::{github::GithubRelease, Result};

/// Remote source of releases and their asset contents.
///
/// Calls are awaited one at a time; implementations need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait ReleaseSource {
    /// List every release of `repository` ("owner/repo") in API order.
    async fn list_releases(&self, repository: &str) -> Result<Vec<GithubRelease>>;

    /// Download the raw content of an asset by its API address.
    async fn fetch_asset(&self, address: &str) -> Result<Vec<u8>>;
}
