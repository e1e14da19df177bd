//! Data models for profile aggregation.
//!
//! This module contains the identifier type, the partial records returned
//! by each upstream source, and the merged `ProfileRecord`.

use crate::error::AggregateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Inclusive range of identifiers accepted by an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub min: i64,
    pub max: i64,
}

impl Default for IdRange {
    fn default() -> Self {
        Self { min: 1, max: 10 }
    }
}

impl IdRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Iterate every identifier in the range, in ascending order.
    ///
    /// Values that cannot be an `Identifier` are skipped.
    pub fn iter(&self) -> impl Iterator<Item = Identifier> {
        (self.min.max(1)..=self.max).filter_map(|v| Identifier::try_from(v).ok())
    }
}

/// A validated, positive profile identifier.
///
/// Deserialization goes through `TryFrom<i64>`, so zero, negative and
/// oversized values are rejected there too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Identifier(u32);

impl Identifier {
    /// Validate a numeric identifier against `range`.
    pub fn new(value: i64, range: IdRange) -> Result<Self, AggregateError> {
        if !range.contains(value) {
            return Err(AggregateError::invalid(value));
        }
        Self::try_from(value)
    }

    /// Validate an arbitrary JSON value. Only integral numbers are accepted.
    pub fn from_value(value: &Value, range: IdRange) -> Result<Self, AggregateError> {
        let number = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            _ => None,
        };

        match number {
            Some(n) => Self::new(n, range),
            None => Err(AggregateError::invalid(value)),
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Identifier {
    type Error = AggregateError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 1 {
            return Err(AggregateError::invalid(value));
        }
        u32::try_from(value)
            .map(Identifier)
            .map_err(|_| AggregateError::invalid(value))
    }
}

impl From<Identifier> for u32 {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Basic user fields from the user source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBasic {
    pub id: Identifier,
    pub name: String,
    pub username: String,
    pub email: String,
}

/// Geographic coordinates, kept as the strings the sources return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geo {
    pub lat: String,
    pub lng: String,
}

/// Postal address of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub street: String,
    pub suite: String,
    pub city: String,
    pub zipcode: String,
    pub geo: Geo,
}

/// Employer details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub name: String,
    pub catch_phrase: String,
    pub bs: String,
}

/// Basic info held by a shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardInfo {
    pub username: String,
    pub website: String,
    pub company: CompanyInfo,
}

/// Sensitive personal fields held by the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInfo {
    pub name: String,
    pub email: String,
    pub address: AddressInfo,
    pub phone: String,
}

/// The merged, flat profile returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: Identifier,
    pub name: String,
    pub username: String,
    pub email: String,
    pub address: AddressInfo,
    pub phone: String,
    pub website: String,
    pub company: CompanyInfo,
}

impl ProfileRecord {
    /// Merge the three parallel sub-records.
    ///
    /// No source provides phone or website in this topology, so both are
    /// synthesized from the identifier.
    pub fn from_parts(user: UserBasic, address: AddressInfo, company: CompanyInfo) -> Self {
        let id = user.id;
        Self {
            id,
            name: user.name,
            username: user.username,
            email: user.email,
            address,
            phone: format!("Phone{}", id),
            website: format!("website{}.com", id),
            company,
        }
    }

    /// Merge shard and vault data for `id`.
    pub fn from_shard_and_vault(id: Identifier, shard: ShardInfo, vault: VaultInfo) -> Self {
        Self {
            id,
            name: vault.name,
            username: shard.username,
            email: vault.email,
            address: vault.address,
            phone: vault.phone,
            website: shard.website,
            company: shard.company,
        }
    }
}

/// Result of looking up one raw identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupOutcome {
    /// The identifier exactly as it was supplied.
    pub input: String,
    /// The merged record, when the lookup succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ProfileRecord>,
    /// Error message, when the lookup failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Upstream cause behind the error, if one was reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl LookupOutcome {
    pub fn success(input: impl Into<String>, record: ProfileRecord) -> Self {
        Self {
            input: input.into(),
            record: Some(record),
            error: None,
            cause: None,
        }
    }

    pub fn failure(input: impl Into<String>, error: &AggregateError) -> Self {
        Self {
            input: input.into(),
            record: None,
            error: Some(error.to_string()),
            cause: error.cause().map(|c| c.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.record.is_some()
    }
}

/// Counts of a batch of lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[LookupOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }

    /// Process exit code for this batch: 0 if every lookup succeeded, 2 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            2
        } else {
            0
        }
    }
}

/// Metadata about a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMetadata {
    /// Strategy used for every lookup.
    pub strategy: String,
    /// When the batch started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the batch in seconds.
    pub duration_seconds: f64,
}

/// Every outcome of a CLI run plus its summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub metadata: BatchMetadata,
    pub outcomes: Vec<LookupOutcome>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn new(metadata: BatchMetadata, outcomes: Vec<LookupOutcome>) -> Self {
        let summary = BatchSummary::from_outcomes(&outcomes);
        Self {
            metadata,
            outcomes,
            summary,
        }
    }
}
