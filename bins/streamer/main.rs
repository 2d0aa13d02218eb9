//! # Quote Streams Demo
//!
//! Runs an in-process engine with a background quote feed, opens one block
//! on it and polls every (item, topic) stream with marker reads, printing
//! each new record as a JSON line.
//!
//! ## Command-line Options
//! - `--config` / `-c`: Watchlist file with one item per line.
//! - `--topics` / `-t`: Comma-separated topics (default `LAST,VOLUME`).
//! - `--size` / `-s`: Stream capacity of the block.
//! - `--timestamps`: Record a timestamp with every value.
//! - `--poll-ms` / `-p`: Poll period in milliseconds.
//! - `--iterations` / `-n`: Number of poll rounds (`0` runs forever).
//! - `--ignore-dirty`: Keep going when the feed overran a marker.
//! - `--log-level` / `-l`: Log level (`error`, `warn`, `info`, `debug`, `trace`).

use quote_streams::block::{Block, LossPolicy};
use quote_streams::config::{BlockConfig, Watchlist};
use quote_streams::errors::{CliError, StreamError};
use quote_streams::feed::QuoteFeed;
use quote_streams::provider::RemoteProvider;
use quote_streams::sim::SimulatedProvider;
use quote_streams::value::Value;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

/// Command-line options for the streamer
#[derive(Debug, StructOpt)]
#[structopt(
    name = "quote_streams",
    about = "Polls simulated quote streams through a block accessor"
)]
struct Opt {
    /// Path to the watchlist file with item symbols
    #[structopt(short, long)]
    config: String,

    /// Comma-separated topics to stream
    #[structopt(short, long, default_value = "LAST,VOLUME")]
    topics: String,

    /// Stream capacity of the block
    #[structopt(short, long, default_value = "1000")]
    size: usize,

    /// Record a timestamp with every value
    #[structopt(long)]
    timestamps: bool,

    /// Poll period in milliseconds
    #[structopt(short, long, default_value = "500")]
    poll_ms: u64,

    /// Number of poll rounds, 0 runs forever
    #[structopt(short = "n", long, default_value = "0")]
    iterations: u64,

    /// Accept data loss instead of failing on a dirty marker
    #[structopt(long)]
    ignore_dirty: bool,

    /// Log level: error, warn, info, debug, trace
    #[structopt(short, long, default_value = "info")]
    log_level: String,
}

/// Initializes the logger using env_logger with the given level
fn init_logger(level: &str) -> Result<(), CliError> {
    let mut builder = env_logger::Builder::new();

    let log_level = match level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    builder.filter_level(log_level);
    builder.format_timestamp_micros();
    builder.format_module_path(false);
    builder.format_target(false);
    builder
        .try_init()
        .map_err(|e| CliError::GeneralError(format!("Failed to init logger: {}", e)))?;

    Ok(())
}

/// Marker-reads one stream and prints every new record.
fn drain(
    block: &Block,
    item: &str,
    topic: &str,
    policy: LossPolicy,
) -> Result<usize, StreamError> {
    let points = block.snapshot_from_marker::<Value>(item, topic, 0, policy)?;
    for point in &points {
        let line = json!({
            "item": item,
            "topic": topic,
            "value": point.value.to_string(),
            "timestamp": point.timestamp.map(|ts| ts.to_string()),
        });
        println!("{}", line);
    }
    Ok(points.len())
}

fn run(opt: &Opt, block: &Block, items: &[String], topics: &[String]) -> Result<(), CliError> {
    let policy = if opt.ignore_dirty {
        LossPolicy::Ignore
    } else {
        LossPolicy::Fail
    };
    let period = Duration::from_millis(opt.poll_ms);

    let mut round = 0u64;
    while opt.iterations == 0 || round < opt.iterations {
        thread::sleep(period);
        round += 1;

        let mut total = 0;
        for item in items {
            for topic in topics {
                total += drain(block, item, topic, policy)?;
            }
        }
        log::debug!("Poll round {} read {} records", round, total);
    }
    Ok(())
}

fn main() -> Result<(), CliError> {
    // Parse CLI arguments
    let opt = Opt::from_args();

    // Initialize logger
    init_logger(&opt.log_level)?;

    log::info!("Starting Quote Streams");
    log::debug!("Command line options: {:?}", opt);

    let watchlist = Watchlist::from_config(&opt.config)?;
    let topics: Vec<String> = opt
        .topics
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    if topics.is_empty() {
        return Err(CliError::GeneralError("No topics given".into()));
    }

    let engine = Arc::new(SimulatedProvider::new());
    let feed = Arc::new(QuoteFeed::new(engine.clone(), &watchlist.items)?);

    let config = BlockConfig::with_size(opt.size).timestamps(opt.timestamps);
    let provider: Arc<dyn RemoteProvider> = engine;
    let block = Block::create(provider, config)?;
    for item in &watchlist.items {
        block.add_item(item)?;
    }
    for topic in &topics {
        block.add_topic(topic)?;
    }
    log::info!(
        "Block {} streams {} items x {} topics",
        block.name(),
        watchlist.items.len(),
        topics.len()
    );

    feed.start()?;
    let result = run(&opt, &block, &watchlist.items, &topics);
    feed.shutdown();
    block.close()?;

    log::info!("Quote Streams shutdown complete");
    result
}
