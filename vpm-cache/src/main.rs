//! vpm-cache CLI
//!
//! Command-line interface for inspecting and invalidating the metadata cache.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vpm_cache::{MetadataCache, Result};

#[derive(Parser)]
#[command(name = "vpm-cache")]
#[command(about = "Metadata cache management for VPM package indexes", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to cache directory
    #[arg(short, long, env = "VPM_CACHE_DIR", default_value = "cache")]
    cache: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List cached entries
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show cache statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the cached metadata for an asset address
    Get {
        /// Asset address (e.g. https://api.github.com/repos/o/r/releases/assets/1)
        #[arg(short, long)]
        address: String,
    },

    /// Invalidate the entry for an asset address
    Remove {
        /// Asset address
        #[arg(short, long)]
        address: String,
    },

    /// Remove every cached entry
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cache = MetadataCache::open(&cli.cache)?;

    match cli.command {
        Commands::List { json } => {
            let entries = cache.entries()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    println!("  {} ({} bytes)", entry.key, entry.size);
                }
                println!();
                println!("Total: {} entries", entries.len());
            }
            Ok(())
        }

        Commands::Stats { json } => {
            let stats = cache.stats()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Cache Statistics for {:?}", cache.root());
                println!("========================");
                println!("Entries:      {}", stats.entries);
                println!("Total bytes:  {}", stats.total_bytes);
            }
            Ok(())
        }

        Commands::Get { address } => {
            match cache.get(&address)? {
                Some(metadata) => {
                    println!("{}", serde_json::to_string_pretty(&metadata)?);
                }
                None => {
                    eprintln!("Not cached: {}", address);
                    std::process::exit(1);
                }
            }
            Ok(())
        }

        Commands::Remove { address } => {
            if cache.remove(&address)? {
                println!("Removed {}", address);
            } else {
                println!("Not cached: {}", address);
            }
            Ok(())
        }

        Commands::Clear => {
            let removed = cache.clear()?;
            println!("Removed {} cached entries from {:?}", removed, cache.root());
            Ok(())
        }
    }
}
