//! vpm-index CLI
//!
//! Command-line interface for generating VPM package indexes from GitHub
//! releases.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use vpm_cache::MetadataCache;
use vpm_index::{
    github::{GithubClient, GITHUB_API_BASE},
    index::{generate, process_descriptor},
    release::select_assets,
    Error, ReleaseSource, Result,
};

#[derive(Parser)]
#[command(name = "vpm-index")]
#[command(about = "Static VPM package index generator", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// GitHub token for API and asset access (falls back to GITHUB_TOKEN)
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = GITHUB_API_BASE)]
    api_base: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an index for every descriptor in a directory
    Generate {
        /// Directory of repository descriptors (*.json)
        #[arg(short, long, env = "VPM_REPOS_DIR", default_value = "repos")]
        repos: PathBuf,

        /// Output directory for index files ({stem}.json)
        #[arg(short, long, env = "VPM_OUTPUT_DIR", default_value = "public")]
        output: PathBuf,

        /// Metadata cache directory
        #[arg(short, long, env = "VPM_CACHE_DIR", default_value = "cache")]
        cache: PathBuf,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Generate the index for a single descriptor file
    Build {
        /// Path to repository descriptor
        descriptor: PathBuf,

        /// Output directory for the index file
        #[arg(short, long, env = "VPM_OUTPUT_DIR", default_value = "public")]
        output: PathBuf,

        /// Metadata cache directory
        #[arg(short, long, env = "VPM_CACHE_DIR", default_value = "cache")]
        cache: PathBuf,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },

    /// List releases of a repository and the assets picked from each
    Releases {
        /// Package repository (e.g., owner/repo)
        #[arg(short, long)]
        repository: String,
    },
}

fn setup_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let token = cli
        .github_token
        .filter(|t| !t.trim().is_empty())
        .or_else(GithubClient::token_from_env)
        .ok_or(Error::MissingToken)?;
    let client = GithubClient::with_api_base(token, &cli.api_base)?;

    match cli.command {
        Commands::Generate {
            repos,
            output,
            cache,
            pretty,
        } => cmd_generate(&client, repos, output, cache, pretty).await,

        Commands::Build {
            descriptor,
            output,
            cache,
            pretty,
        } => {
            let cache = MetadataCache::open(cache)?;
            process_descriptor(&client, &cache, &descriptor, &output, pretty).await?;
            Ok(())
        }

        Commands::Releases { repository } => cmd_releases(&client, repository).await,
    }
}

async fn cmd_generate(
    client: &GithubClient,
    repos: PathBuf,
    output: PathBuf,
    cache: PathBuf,
    pretty: bool,
) -> Result<()> {
    info!("Generating indexes from {:?} into {:?}", repos, output);

    let cache = MetadataCache::open(cache)?;
    let report = generate(client, &cache, &repos, &output, pretty).await?;

    info!(
        "Wrote {} of {} indexes",
        report.written.len(),
        report.total()
    );

    if !report.is_success() {
        for failure in &report.failed {
            error!("  {:?}: {}", failure.path, failure.error);
        }
        return Err(Error::Other(format!(
            "{} of {} descriptors failed",
            report.failed.len(),
            report.total()
        )));
    }

    Ok(())
}

async fn cmd_releases(client: &GithubClient, repository: String) -> Result<()> {
    info!("Fetching releases for {}", repository);
    let releases = client.list_releases(&repository).await?;

    println!("Repository: {}", repository);
    println!("Releases: {}", releases.len());
    println!();

    for release in &releases {
        let assets = select_assets(release);
        let marker = if release.prerelease { " (prerelease)" } else { "" };
        println!("{}{}", release.title(), marker);

        match assets.metadata {
            Some(asset) => println!("  metadata: {}", asset.url),
            None => println!("  metadata: none (skipped)"),
        }
        match assets.archive {
            Some(asset) => println!("  archive:  {}", asset.browser_download_url),
            None => println!("  archive:  none"),
        }
    }

    Ok(())
}
