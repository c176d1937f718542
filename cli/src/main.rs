//! CoinRates CLI
//!
//! Resolves exchange rates for one base currency and prints the result as
//! JSON on stdout. Failures print an error envelope and exit with status 1.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coinrates_common::{ErrorDetails, RateError};
use coinrates_engine::{EngineConfig, ExchangeRateResolver, RemoteRateFetcher};
use coinrates_fetcher::HttpRateFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

/// CoinRates exchange rate lookup
#[derive(Parser, Debug)]
#[command(name = "coinrates")]
#[command(about = "Resolve current exchange rates for a base currency")]
struct Args {
    /// Path to the JSON settings file
    #[arg(short, long)]
    config: PathBuf,

    /// Base currency symbol, e.g. BTC
    base: String,

    /// Comma-separated target symbols (defaults from settings when omitted)
    #[arg(short, long)]
    targets: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value = "json")]
    log_format: LogFormat,
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    // stdout carries the result
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Split a comma-separated target list, skipping blanks.
fn parse_targets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Resolve and render the result JSON, or the error envelope on failure.
async fn resolve_to_json(
    config: &EngineConfig,
    fetcher: Arc<dyn RemoteRateFetcher>,
    base: &str,
    targets: Option<&[String]>,
) -> Result<String, ErrorDetails> {
    let resolver = ExchangeRateResolver::from_config(config, fetcher)
        .await
        .map_err(|e| ErrorDetails::from(&e))?;

    let rates = resolver
        .get_exchange_rates(base, targets)
        .await
        .map_err(|e| ErrorDetails::from(&e))?;

    serde_json::to_string_pretty(&rates)
        .map_err(|e| ErrorDetails::new("INTERNAL_SERVER_ERROR", e.to_string(), 500))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_format);

    info!(base = %args.base, "Starting CoinRates lookup");

    let config = match EngineConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            let e = RateError::from(e);
            error!(error = %e, "Invalid configuration");
            println!("{}", ErrorDetails::from(&e).to_json());
            std::process::exit(1);
        }
    };

    let fetcher: Arc<dyn RemoteRateFetcher> = Arc::new(match config.request_timeout() {
        Some(timeout) => HttpRateFetcher::with_timeout(timeout),
        None => HttpRateFetcher::default(),
    });

    let targets = args.targets.as_deref().map(parse_targets);

    match resolve_to_json(&config, fetcher, &args.base, targets.as_deref()).await {
        Ok(json) => {
            println!("{}", json);
            Ok(())
        }
        Err(details) => {
            error!(code = %details.code, message = %details.message, "Lookup failed");
            println!("{}", details.to_json());
            std::process::exit(1);
        }
    }
}
