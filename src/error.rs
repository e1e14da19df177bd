//! Error types for upstream sources and aggregation.

use crate::sources::SourceKind;
use std::fmt;
use thiserror::Error;

/// Failure reported by a single upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("{kind} has no record for id {id}")]
    NotFound { kind: SourceKind, id: u32 },

    #[error("{kind} unavailable: {reason}")]
    Unavailable { kind: SourceKind, reason: String },

    #[error("unknown shard '{0}'")]
    UnknownShard(String),
}

/// Failure of a whole `get_user_data` call.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The input is not an integer inside the accepted range.
    #[error("Invalid ID: {input}")]
    InvalidIdentifier { input: String },

    /// A parallel fetch failed. The message stays generic; the cause is
    /// still reachable through `source()`.
    #[error("Failed to fetch data")]
    FetchFailure {
        #[source]
        cause: SourceError,
    },

    /// A step of the resolve-then-fetch chain failed.
    #[error("Error retrieving data: {cause}")]
    AggregationFailure {
        #[source]
        cause: SourceError,
    },
}

impl AggregateError {
    pub fn invalid(input: impl fmt::Display) -> Self {
        Self::InvalidIdentifier {
            input: input.to_string(),
        }
    }

    /// The upstream error behind this failure, if any.
    pub fn cause(&self) -> Option<&SourceError> {
        match self {
            Self::InvalidIdentifier { .. } => None,
            Self::FetchFailure { cause } | Self::AggregationFailure { cause } => Some(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_fetch_failure_keeps_cause() {
        let err = AggregateError::FetchFailure {
            cause: SourceError::NotFound {
                kind: SourceKind::Address,
                id: 4,
            },
        };
        assert_eq!(err.to_string(), "Failed to fetch data");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("address source has no record for id 4"));
    }

    #[test]
    fn test_aggregation_failure_embeds_cause() {
        let err = AggregateError::AggregationFailure {
            cause: SourceError::UnknownShard("db9".to_string()),
        };
        assert_eq!(err.to_string(), "Error retrieving data: unknown shard 'db9'");
        assert_eq!(err.cause(), Some(&SourceError::UnknownShard("db9".to_string())));
    }

    #[test]
    fn test_invalid_identifier_has_no_cause() {
        let err = AggregateError::invalid(-1);
        assert_eq!(err.to_string(), "Invalid ID: -1");
        assert!(err.cause().is_none());
    }
}
