use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use og_preview::config::{self, FetcherConfig};
use og_preview::fetcher::{MetadataFetcher, OgImageFetcher};

#[derive(Parser, Debug)]
#[command(about = "Fetch one page and print its og:image")]
struct Args {
    /// Path to YAML config; fetcher defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Page to inspect
    url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let fetcher_cfg = match &args.config {
        Some(path) => config::load(Some(path))?.fetcher,
        None => FetcherConfig::default(),
    };
    let fetcher = OgImageFetcher::from_config(&fetcher_cfg).context("failed to build http client")?;

    match fetcher.extract_image(&args.url).await {
        Some(image_url) => println!("{}", image_url),
        None => println!("no og:image for {}", args.url),
    }
    Ok(())
}
