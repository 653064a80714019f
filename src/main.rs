//! Index builder binary.
//!
//! Harvests the Scoop buckets and the winget repository into one
//! deduplicated `public/db.json`, the flat file the search UI loads
//! whole. Developer runs memoize fetches in a temp-dir cache store; CI
//! runs always hit the network.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use manifest_indexer::harvest::formats::{ScoopParser, WingetParser};
use manifest_indexer::{CacheStore, CachedFetch, Fetch, HarvestPipeline, HttpFetcher, SourceSpec};

// Source repositories in dedup-priority order: earlier entries win
// identifier collisions.
const SCOOP_MAIN: &str = "https://github.com/ScoopInstaller/Main";
const SCOOP_EXTRAS: &str = "https://github.com/lukesampson/scoop-extras";
const WINGET_PKGS: &str = "https://github.com/microsoft/winget-pkgs";

const OUTPUT_DIR: &str = "public";
const OUTPUT_FILE: &str = "public/db.json";
const CACHE_FILE: &str = "manifest-indexer-cache.json";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "harvest aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = HttpFetcher::new();

    // Cache gating is a deployment policy: CI always refetches, local
    // iteration stays under upstream rate limits.
    if std::env::var_os("CI").is_some() {
        build_index(fetcher).await
    } else {
        let cache_path = std::env::temp_dir().join(CACHE_FILE);
        let store = CacheStore::load(&cache_path)?;
        build_index(CachedFetch::new(fetcher, store)).await
    }
}

async fn build_index(fetcher: impl Fetch) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = HarvestPipeline::new(fetcher)
        .with_source(SourceSpec::new(SCOOP_MAIN, ScoopParser))
        .with_source(SourceSpec::new(SCOOP_EXTRAS, ScoopParser))
        .with_source(SourceSpec::new(WINGET_PKGS, WingetParser::new()));

    let records = pipeline.run().await?;
    let data = serde_json::to_vec(&records)?;

    std::fs::create_dir_all(OUTPUT_DIR)?;
    std::fs::write(OUTPUT_FILE, &data)?;

    info!(
        records = records.len(),
        bytes = data.len(),
        path = OUTPUT_FILE,
        "index written"
    );
    Ok(())
}
