//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.profagg.toml` files.

use crate::aggregator::Strategy;
use crate::cli::OutputFormat;
use crate::models::IdRange;
use crate::sources::SourceKind;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".profagg.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// Mock source settings.
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Output format for records.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Source topology to aggregate over.
    #[serde(default)]
    pub strategy: Strategy,

    /// Smallest accepted identifier.
    #[serde(default = "default_min_id")]
    pub min_id: i64,

    /// Largest accepted identifier.
    #[serde(default = "default_max_id")]
    pub max_id: i64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            min_id: default_min_id(),
            max_id: default_max_id(),
        }
    }
}

fn default_min_id() -> i64 {
    1
}

fn default_max_id() -> i64 {
    10
}

impl AggregatorConfig {
    pub fn id_range(&self) -> IdRange {
        IdRange::new(self.min_id, self.max_id)
    }
}

/// Mock source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Simulated latency of every source call, in milliseconds.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Shard names handed out by the central directory, in rotation order.
    #[serde(default = "default_shards")]
    pub shards: Vec<String>,

    /// Source kinds that always fail.
    #[serde(default)]
    pub fail: Vec<SourceKind>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            shards: default_shards(),
            fail: Vec::new(),
        }
    }
}

fn default_latency_ms() -> u64 {
    100
}

fn default_shards() -> Vec<String> {
    vec!["db1", "db2", "db3"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.profagg.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(strategy) = args.strategy {
            self.aggregator.strategy = strategy;
        }

        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(latency) = args.latency_ms {
            self.sources.latency_ms = latency;
        }

        for kind in &args.fail {
            if !self.sources.fail.contains(kind) {
                self.sources.fail.push(*kind);
            }
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Reject settings no aggregator can work with.
    pub fn validate(&self) -> Result<()> {
        if self.aggregator.min_id < 1 {
            bail!("min_id must be at least 1");
        }
        if self.aggregator.min_id > self.aggregator.max_id {
            bail!(
                "min_id ({}) must not exceed max_id ({})",
                self.aggregator.min_id,
                self.aggregator.max_id
            );
        }
        if self.aggregator.max_id > i64::from(u32::MAX) {
            bail!("max_id must not exceed {}", u32::MAX);
        }
        if self.sources.shards.is_empty() {
            bail!("At least one shard must be configured");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
