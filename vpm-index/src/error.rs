use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] vpm_cache::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("GitHub API returned {status} for {url}")]
    Api { status: u16, url: String },

    #[error("No GitHub token provided (set GH_TOKEN or GITHUB_TOKEN)")]
    MissingToken,

    #[error("GitHub token is not a valid header value")]
    InvalidToken,

    #[error("Invalid repository identifier: {0}")]
    InvalidRepository(String),

    #[error("Invalid repository descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Release {repository}:{release} has package.json but no .zip asset")]
    MissingArchive { repository: String, release: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
