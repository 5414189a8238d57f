#![forbid(unsafe_code)]

use error_iter::ErrorIter as _;
use onlyargs::{CliError, OnlyArgs as _};
use onlyargs_derive::OnlyArgs;
use std::{path::PathBuf, process::ExitCode};
use swapsum::{config::Config, rates::RateResolver};
use thiserror::Error;

#[derive(Debug, Error)]
enum Error {
    #[error("CLI error")]
    Cli(#[from] CliError),

    #[error("Config error")]
    Config(#[from] swapsum::errors::ConfigError),

    #[error("Rate resolution error")]
    Rate(#[from] swapsum::errors::RateError),
}

/// Query a historical cross rate through the resolver and its caches.
#[derive(Debug, OnlyArgs)]
struct Args {
    /// Currency to price.
    #[default("BTC")]
    from: String,

    /// Currency to price it in.
    #[default("USD")]
    to: String,

    /// Lookup date (YYYY-MM-DD).
    date: String,

    /// Config JSON with the provider API keys.
    #[default("./config.json")]
    config: PathBuf,
}

fn main() -> ExitCode {
    match run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            if matches!(err, Error::Cli(_)) {
                eprintln!("{}", Args::HELP);
            }

            eprintln!("Error: {err}");
            for source in err.sources().skip(1) {
                eprintln!("  Caused by: {source}");
            }

            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Error> {
    let args: Args = onlyargs::parse()?;

    let config = Config::load(&args.config)?;
    let mut resolver = RateResolver::new(&config);
    let rate = resolver.cross_rate(&args.from, &args.to, &args.date)?;

    println!("pair:\t{}_{}", args.from, args.to);
    println!("date:\t{}", args.date);
    println!("rate:\t{rate}");

    Ok(())
}
