#![forbid(unsafe_code)]

use error_iter::ErrorIter as _;
use is_terminal::IsTerminal as _;
use onlyargs::CliError;
use onlyargs_derive::OnlyArgs;
use std::path::PathBuf;
use std::{env, fs, process::ExitCode};
use swapsum::check::{run_check, FetchResult};
use swapsum::config::Config;
use swapsum::model::{Interval, SwapRunParams};
use swapsum::reconcile::DiskCache;
use thiserror::Error;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

/// Reconcile a swap service's transaction log and print time-bucketed volume
/// totals.
#[derive(Debug, OnlyArgs)]
#[footer = "Additional environment variables:"]
#[footer = "  - RUST_LOG configures log filtering, e.g. RUST_LOG=debug"]
#[footer = "      https://docs.rs/tracing-subscriber/latest/tracing_subscriber/struct.EnvFilter.html#directives"]
#[footer = "  - TERM_COLOR accepts \"always\" to override automatic terminal sensing"]
struct Args {
    /// Transaction disk cache file.
    #[short('f')]
    #[default("./cache/swapRaw.json")]
    cache_file: PathBuf,

    /// Read a JSON array of newly fetched transactions from a file.
    ///   When omitted, the run is cache-only.
    #[long]
    new_txs: Option<PathBuf>,

    /// Config JSON with the provider API keys.
    #[short('c')]
    #[default("./config.json")]
    config: PathBuf,

    /// Bucket granularity: day, month, hour or mins.
    #[default("month")]
    interval: String,

    /// Stop aggregating at buckets older than this date (YYYY-MM-DD).
    #[default("2017-01-01")]
    end_date: String,

    /// Suppress the new-transaction report; reuse the cache only.
    use_cache: bool,

    /// Label for log lines.
    #[short('p')]
    #[default("swap")]
    prefix: String,
}

#[derive(Debug, Error)]
enum Error {
    #[error("Argument parsing error")]
    Args(#[from] CliError),

    #[error("Config error")]
    Config(#[from] swapsum::errors::ConfigError),

    #[error("Swap check failed")]
    Check(#[from] swapsum::errors::CheckError),
}

fn main() -> ExitCode {
    // Initialize the tracing subscriber for instrumentation.
    // Uses the `RUST_LOG` environment var for configuration. E.g. `RUST_LOG=debug cargo run`
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let term_color = env::var("TERM_COLOR")
        .map(|color| color == "always")
        .unwrap_or_else(|_| std::io::stdout().is_terminal());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(term_color))
        .with(env_filter)
        .init();

    match run(onlyargs::parse()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            for source in err.sources().skip(1) {
                eprintln!("  Caused by: {source}");
            }

            ExitCode::FAILURE
        }
    }
}

fn run(args: Result<Args, CliError>) -> Result<(), Error> {
    let args = args?;

    let config = Config::load(&args.config)?;
    let interval: Interval = args.interval.parse().unwrap_or_default();
    let params = SwapRunParams {
        use_cache: args.use_cache || args.new_txs.is_none(),
        interval,
        end_date: args.end_date.clone(),
    };

    // File-based stand-in for a swap provider's API fetch: the prior disk
    // cache plus an optional batch of newly downloaded transactions.
    let cache_file = args.cache_file.clone();
    let new_txs = args.new_txs.clone();
    let fetch = move |_params: &SwapRunParams| {
        let disk_cache = DiskCache::load(&cache_file)?;
        let new_transactions = match &new_txs {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => Vec::new(),
        };

        Ok(FetchResult {
            disk_cache,
            new_transactions,
        })
    };

    let report = run_check(fetch, &args.cache_file, &args.prefix, &config, &params)?;

    println!("{} volume by {:?}", args.prefix, interval);
    println!();
    for (bucket, data) in &report {
        println!(
            "{bucket}: txs {:>6}  base {:>18}  fiat {:>18}",
            data.tx_count, data.amount_base, data.amount_fiat
        );
        for (currency, amount) in &data.currency_amount {
            println!("    {currency:>6} {amount:>18}");
        }
    }

    Ok(())
}
