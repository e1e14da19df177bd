//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::aggregator::Strategy;
use crate::sources::SourceKind;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// profagg - merge user profiles from sharded upstream sources
///
/// Looks up one or more identifiers and prints the merged profile
/// record for each, or the error that stopped the lookup.
///
/// Examples:
///   profagg --id 1
///   profagg --id 3 --id 7 --strategy chained
///   profagg --all --format text
///   profagg --input ids.json
///   profagg --id 2 --strategy chained --fail vault
///   profagg --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Identifier to look up (repeatable)
    ///
    /// Taken as raw text; anything that is not an integer in the
    /// configured range is rejected without querying a source.
    #[arg(short = 'i', long = "id", value_name = "ID", allow_hyphen_values = true)]
    pub ids: Vec<String>,

    /// Look up every identifier in the configured range
    #[arg(long, conflicts_with_all = ["ids", "input"])]
    pub all: bool,

    /// JSON file holding an array of identifiers to look up
    ///
    /// Entries may be of any JSON type; non-integers are reported as
    /// invalid identifiers.
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Aggregation strategy
    ///
    /// Overrides the config file. Can also be set via PROFAGG_STRATEGY.
    #[arg(short, long, value_name = "STRATEGY", env = "PROFAGG_STRATEGY")]
    pub strategy: Option<Strategy>,

    /// Output format (json, text)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Simulated latency of every source call, in milliseconds
    #[arg(long, value_name = "MS")]
    pub latency_ms: Option<u64>,

    /// Make a source always fail (repeatable)
    #[arg(long, value_name = "SOURCE")]
    pub fail: Vec<SourceKind>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .profagg.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .profagg.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for profile records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON (default)
    #[default]
    Json,
    /// Indented plain text
    Text,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.ids.is_empty() && !self.all && self.input.is_none() {
            return Err("Provide at least one --id, an --input file, or --all".to_string());
        }

        if let Some(ref path) = self.input {
            if !path.is_file() {
                return Err(format!("Input file does not exist: {}", path.display()));
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref path) = self.config {
            if !path.is_file() {
                return Err(format!("Config file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `[general] verbose` from the config file;
    /// --quiet still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
