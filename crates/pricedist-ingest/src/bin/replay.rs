//! Replay one price distribution file through the ingest pipeline
//!
//! Used to redrive a file by hand after a failed invocation:
//!
//! ```bash
//! pricedist-replay --bucket sod-auctions --key "price-distributions/2026-10-14 06.csv"
//! pricedist-replay --bucket sod-auctions --key "price-distributions%2Flatest.csv" --escaped --dry-run
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use pricedist_common::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use tracing::info;

use pricedist_ingest::{
    config::IngestConfig,
    coordinator::EventCoordinator,
    models::FileReference,
    parser::parse_batch,
    storage::{ObjectFetcher, S3Fetcher},
};

#[derive(Parser, Debug)]
#[command(name = "pricedist-replay")]
#[command(author, version, about = "Replay a price distribution file into the database")]
struct Cli {
    /// Bucket holding the file
    #[arg(short, long, env = "REPLAY_BUCKET")]
    bucket: String,

    /// Object key of the file
    #[arg(short, long)]
    key: String,

    /// The key is escaped as it appears in an S3 notification
    #[arg(long)]
    escaped: bool,

    /// Fetch and parse only, do not touch the database
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .format(LogFormat::Text)
        .include_targets(cli.verbose)
        .filter_directives("sqlx=warn,aws_config=warn")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    let config = IngestConfig::from_env()?;

    let file = if cli.escaped {
        FileReference::new(&cli.bucket, &cli.key)
    } else {
        FileReference::new(&cli.bucket, urlencoding::encode(&cli.key).into_owned())
    };

    if cli.dry_run {
        let key = file.decoded_key()?;
        let body = S3Fetcher::new(config.storage.clone())
            .fetch(&file.bucket, &key)
            .await?;
        let batch = parse_batch(body, &key)
            .await
            .with_context(|| format!("Failed to parse s3://{}/{}", file.bucket, key))?;
        info!(records = batch.len(), "Dry run complete, database untouched");
        return Ok(());
    }

    let coordinator = EventCoordinator::from_config(&config).await?;
    let result = coordinator.handle(std::slice::from_ref(&file)).await;
    coordinator.shutdown().await;

    let summary = result?;
    info!(records = summary.records_written, "Replay complete");

    Ok(())
}
