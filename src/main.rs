//! profagg - user profile aggregator
//!
//! Merges profile data from several upstream sources into one record per
//! identifier, either by fetching user, address and company data in
//! parallel or by resolving a shard through a central directory first.
//!
//! Exit codes:
//!   0 - Every lookup succeeded
//!   1 - Runtime error (bad config, unreadable input, etc.)
//!   2 - At least one lookup failed

mod aggregator;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod sources;

use aggregator::{build_aggregator, ProfileAggregator, Strategy};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, CONFIG_FILE};
use models::{BatchMetadata, BatchReport, IdRange, LookupOutcome};
use serde_json::Value;
use sources::MockSources;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config feeds the log level
    let (config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config)?;

    info!("profagg v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    origin.log();

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .profagg.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so stdout carries only the report. `RUST_LOG`
/// overrides the level chosen by --verbose / --quiet and the config file.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = args.log_level(config.general.verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// One identifier to look up, in the shape it was supplied.
#[derive(Debug)]
enum Request {
    Number(i64),
    Text(String),
    Json(Value),
}

/// Look up every requested identifier. Returns exit code (0 or 2).
async fn run(args: Args, mut config: Config) -> Result<i32> {
    config.merge_with_args(&args);
    config.validate()?;

    let range = config.aggregator.id_range();
    let strategy = config.aggregator.strategy;

    let mocks = Arc::new(MockSources::from_config(&config.sources, range));
    let aggregator = build_aggregator(strategy, range, mocks.parallel(), mocks.chained());

    info!(
        "Strategy: {} | ids {}..={} | latency {}ms",
        strategy, range.min, range.max, config.sources.latency_ms
    );
    if strategy == Strategy::Chained {
        info!("Shards: {}", config.sources.shards.join(", "));
    }
    if !config.sources.fail.is_empty() {
        warn!("Injected failures: {:?}", config.sources.fail);
    }

    let requests = collect_requests(&args, range)?;
    debug!("{} lookups queued", requests.len());

    let started_at = Utc::now();
    let start = Instant::now();

    // One lookup at a time, in input order.
    let mut outcomes = Vec::with_capacity(requests.len());
    for request in requests {
        outcomes.push(lookup(aggregator.as_ref(), request).await);
    }

    let report = BatchReport::new(
        BatchMetadata {
            strategy: strategy.to_string(),
            started_at,
            duration_seconds: start.elapsed().as_secs_f64(),
        },
        outcomes,
    );

    let output = report::render_report(&report, config.general.format)?;
    match args.output {
        Some(ref path) => {
            report::write_report(&output, path)?;
            info!("Report saved to {}", path.display());
        }
        None => print!("{}", output),
    }

    info!(
        "Done: {} succeeded, {} failed",
        report.summary.succeeded, report.summary.failed
    );

    Ok(report.summary.exit_code())
}

/// Gather identifiers from --all, --id and --input, in that order.
fn collect_requests(args: &Args, range: IdRange) -> Result<Vec<Request>> {
    if args.all {
        return Ok(range
            .iter()
            .map(|id| Request::Number(i64::from(id.get())))
            .collect());
    }

    let mut requests: Vec<Request> = args.ids.iter().cloned().map(Request::Text).collect();

    if let Some(ref path) = args.input {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        let values: Vec<Value> = serde_json::from_str(&content).with_context(|| {
            format!("Input file must hold a JSON array: {}", path.display())
        })?;
        requests.extend(values.into_iter().map(Request::Json));
    }

    Ok(requests)
}

/// Run one lookup and record its outcome.
async fn lookup(aggregator: &dyn ProfileAggregator, request: Request) -> LookupOutcome {
    let (input, result) = match request {
        Request::Number(id) => (id.to_string(), aggregator.get_user_data(id).await),
        Request::Text(text) => {
            let result = aggregator.get_user_data_raw(&text).await;
            (text, result)
        }
        Request::Json(value) => {
            let result = aggregator.get_user_data_value(&value).await;
            (value.to_string(), result)
        }
    };

    match result {
        Ok(record) => {
            debug!("Assembled profile for {}", input);
            LookupOutcome::success(input, record)
        }
        Err(e) => {
            warn!("Lookup for {} failed: {}", input, e);
            LookupOutcome::failure(input, &e)
        }
    }
}

/// Where the configuration came from, logged once logging is up.
#[derive(Debug, PartialEq)]
enum ConfigOrigin {
    File(PathBuf),
    Defaults,
    Fallback(String),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded config from {}", path.display()),
            ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
            ConfigOrigin::Fallback(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults.
///
/// An explicit --config path must load; a broken default file falls back
/// to defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::File(config_path.clone())));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::File(PathBuf::from(CONFIG_FILE)))),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Fallback(format!("{:#}", e)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;

    #[test]
    fn test_collect_all_requests() {
        let mut args = make_args();
        args.ids.clear();
        args.all = true;

        let requests = collect_requests(&args, IdRange::new(3, 5)).unwrap();
        let ids: Vec<i64> = requests
            .iter()
            .filter_map(|r| match r {
                Request::Number(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn test_collect_ids_and_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.json");
        std::fs::write(&path, r#"[2, "x", null]"#).unwrap();

        let mut args = make_args();
        args.input = Some(path);

        let requests = collect_requests(&args, IdRange::default()).unwrap();
        assert_eq!(requests.len(), 4);
        assert!(matches!(&requests[0], Request::Text(t) if t == "1"));
        assert!(matches!(&requests[3], Request::Json(Value::Null)));
    }

    #[test]
    fn test_collect_rejects_non_array_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.json");
        std::fs::write(&path, r#"{"id": 1}"#).unwrap();

        let mut args = make_args();
        args.input = Some(path);
        assert!(collect_requests(&args, IdRange::default()).is_err());
    }

    #[test]
    fn test_load_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[general]\nverbose = true\n").unwrap();

        let mut args = make_args();
        args.config = Some(path.clone());

        let (config, origin) = load_config(&args).unwrap();
        assert!(config.general.verbose);
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);
        assert_eq!(origin, ConfigOrigin::File(path));
    }

    #[test]
    fn test_load_explicit_config_must_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[general\n").unwrap();

        let mut args = make_args();
        args.config = Some(path);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_all_requests_for_oversized_range() {
        let mut args = make_args();
        args.ids.clear();
        args.all = true;

        let above_u32 = i64::from(u32::MAX) + 2;
        let requests = collect_requests(&args, IdRange::new(above_u32, above_u32)).unwrap();
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_outcomes() {
        let mocks = Arc::new(
            MockSources::default()
                .with_latency(std::time::Duration::ZERO)
                .failing(sources::SourceKind::Central),
        );
        let parallel = build_aggregator(
            Strategy::Parallel,
            IdRange::default(),
            mocks.parallel(),
            mocks.chained(),
        );
        let chained = build_aggregator(
            Strategy::Chained,
            IdRange::default(),
            mocks.parallel(),
            mocks.chained(),
        );

        let ok = lookup(parallel.as_ref(), Request::Text("1".to_string())).await;
        assert!(ok.is_success());
        assert_eq!(ok.record.unwrap().name, "User1");

        let invalid = lookup(parallel.as_ref(), Request::Json(Value::Bool(true))).await;
        assert_eq!(invalid.input, "true");
        assert_eq!(invalid.error.as_deref(), Some("Invalid ID: true"));

        let failed = lookup(chained.as_ref(), Request::Number(4)).await;
        assert!(!failed.is_success());
        assert_eq!(
            failed.error.as_deref(),
            Some("Error retrieving data: central directory unavailable: injected failure")
        );
        assert_eq!(
            failed.cause.as_deref(),
            Some("central directory unavailable: injected failure")
        );
    }
}
