//! Batch report rendering.
//!
//! Turns lookup outcomes into either pretty JSON or an indented text
//! listing modelled on a console dump of each record.

use crate::cli::OutputFormat;
use crate::models::{BatchReport, BatchSummary, LookupOutcome, ProfileRecord};
use anyhow::{Context, Result};
use std::path::Path;

/// Render the whole report in the requested format.
pub fn render_report(report: &BatchReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => generate_json_report(report),
        OutputFormat::Text => Ok(generate_text_report(report)),
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &BatchReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate a plain text report.
pub fn generate_text_report(report: &BatchReport) -> String {
    let mut output = String::new();

    for outcome in &report.outcomes {
        output.push_str(&generate_outcome_block(outcome));
        output.push('\n');
    }

    output.push_str(&generate_summary_text(&report.summary));
    output.push_str(&format!(
        "Strategy: {} | Duration: {:.2}s\n",
        report.metadata.strategy, report.metadata.duration_seconds
    ));

    output
}

fn generate_outcome_block(outcome: &LookupOutcome) -> String {
    let mut block = format!("Fetching data for user with ID {}:\n", outcome.input);

    match (&outcome.record, &outcome.error) {
        (Some(record), _) => block.push_str(&render_record_text(record)),
        (None, Some(error)) => {
            block.push_str(&format!("  Error: {}\n", error));
            if let Some(ref cause) = outcome.cause {
                block.push_str(&format!("  Cause: {}\n", cause));
            }
        }
        (None, None) => block.push_str("  (no result)\n"),
    }

    block
}

/// Render one record as an indented text block.
pub fn render_record_text(record: &ProfileRecord) -> String {
    let mut text = String::new();

    text.push_str(&format!("  id: {}\n", record.id));
    text.push_str(&format!("  name: {}\n", record.name));
    text.push_str(&format!("  username: {}\n", record.username));
    text.push_str(&format!("  email: {}\n", record.email));

    let address = &record.address;
    text.push_str("  address:\n");
    text.push_str(&format!("    street: {}\n", address.street));
    text.push_str(&format!("    suite: {}\n", address.suite));
    text.push_str(&format!("    city: {}\n", address.city));
    text.push_str(&format!("    zipcode: {}\n", address.zipcode));
    text.push_str(&format!(
        "    geo: lat {}, lng {}\n",
        address.geo.lat, address.geo.lng
    ));

    text.push_str(&format!("  phone: {}\n", record.phone));
    text.push_str(&format!("  website: {}\n", record.website));

    let company = &record.company;
    text.push_str("  company:\n");
    text.push_str(&format!("    name: {}\n", company.name));
    text.push_str(&format!("    catchPhrase: {}\n", company.catch_phrase));
    text.push_str(&format!("    bs: {}\n", company.bs));

    text
}

/// One-line summary of a batch.
pub fn generate_summary_text(summary: &BatchSummary) -> String {
    format!(
        "Lookups: {} | Succeeded: {} | Failed: {}\n",
        summary.total, summary.succeeded, summary.failed
    )
}

/// Write rendered output to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
