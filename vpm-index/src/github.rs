//! GitHub releases client
//!
//! Lists repository releases and downloads release assets through the
//! GitHub REST API, authenticating every request with a bearer token.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{traits::ReleaseSource, Error, Result};

pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const TOKEN_ENV: [&str; 2] = ["GH_TOKEN", "GITHUB_TOKEN"];

const PER_PAGE: usize = 100;

/// Release as returned by `GET /repos/{owner}/{repo}/releases`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubRelease {
    pub name: Option<String>,
    pub tag_name: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
}

impl GithubRelease {
    /// Version label of the release: its title, or the tag when untitled
    pub fn title(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.tag_name,
        }
    }
}

/// Release asset descriptor
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubAsset {
    pub name: String,
    /// API address; returns the content with `Accept: application/octet-stream`
    pub url: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// Authenticated GitHub client sharing one connection pool
#[derive(Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
    authorization: HeaderValue,
}

impl GithubClient {
    /// Create a client for api.github.com
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_api_base(token, GITHUB_API_BASE)
    }

    /// Create a client for a specific API base (e.g. GitHub Enterprise)
    pub fn with_api_base(token: impl Into<String>, api_base: &str) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::MissingToken);
        }

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|_| Error::InvalidToken)?;
        authorization.set_sensitive(true);

        let client = reqwest::Client::builder()
            .user_agent(concat!("vpm-index/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            authorization,
        })
    }

    /// Read the token from the first non-empty variable in [`TOKEN_ENV`]
    pub fn token_from_env() -> Option<String> {
        TOKEN_ENV
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.trim().is_empty())
    }

    /// Create a client from the process environment
    pub fn from_env() -> Result<Self> {
        let token = Self::token_from_env().ok_or(Error::MissingToken)?;
        Self::new(token)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn releases_url(&self, repository: &str, page: u32) -> String {
        format!(
            "{}/repos/{}/releases?per_page={}&page={}",
            self.api_base, repository, PER_PAGE, page
        )
    }

    fn api_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static("2022-11-28"),
        );
        headers
    }

    fn asset_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert(ACCEPT, HeaderValue::from_static("application/octet-stream"));
        headers
    }
}

impl ReleaseSource for GithubClient {
    async fn list_releases(&self, repository: &str) -> Result<Vec<GithubRelease>> {
        let mut releases = Vec::new();

        for page in 1.. {
            let url = self.releases_url(repository, page);
            debug!("Fetching {}", url);

            let response = self
                .client
                .get(&url)
                .headers(self.api_headers())
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(Error::Api {
                    status: response.status().as_u16(),
                    url,
                });
            }

            let batch: Vec<GithubRelease> = response.json().await?;
            let count = batch.len();
            releases.extend(batch);

            if count < PER_PAGE {
                break;
            }
        }

        debug!("Found {} releases for {}", releases.len(), repository);
        Ok(releases)
    }

    async fn fetch_asset(&self, address: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(address)
            .headers(self.asset_headers())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status().as_u16(),
                url: address.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
