//! Profile aggregation strategies.
//!
//! Both strategies answer the same question, "what is the full profile for
//! this id?", over different source topologies:
//! - `parallel`: user, address and company sources fetched together
//! - `chained`: central lookup, then the resolved shard and the vault

pub mod chained;
pub mod parallel;

use crate::error::AggregateError;
use crate::models::{IdRange, Identifier, ProfileRecord};
use crate::sources::{ChainedSources, ParallelSources};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub use chained::ChainedAggregator;
pub use parallel::ParallelAggregator;

/// Which source topology to aggregate over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Fetch user, address and company concurrently (default)
    #[default]
    Parallel,
    /// Resolve the shard first, then fetch shard and vault
    Chained,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Parallel => write!(f, "parallel"),
            Strategy::Chained => write!(f, "chained"),
        }
    }
}

#[async_trait]
pub trait ProfileAggregator: Send + Sync {
    /// Range of identifiers this aggregator accepts.
    fn id_range(&self) -> IdRange;

    /// Fetch and merge the profile of an already validated identifier.
    async fn assemble(&self, id: Identifier) -> Result<ProfileRecord, AggregateError>;

    /// Validate `id`, then fetch and merge its profile.
    ///
    /// Rejected ids never reach a source.
    async fn get_user_data(&self, id: i64) -> Result<ProfileRecord, AggregateError> {
        let id = Identifier::new(id, self.id_range())?;
        self.assemble(id).await
    }

    /// Like `get_user_data`, for identifiers given as text.
    async fn get_user_data_raw(&self, input: &str) -> Result<ProfileRecord, AggregateError> {
        let id: i64 = input
            .trim()
            .parse()
            .map_err(|_| AggregateError::invalid(input))?;
        self.get_user_data(id).await
    }

    /// Like `get_user_data`, for identifiers of unknown JSON type.
    async fn get_user_data_value(&self, input: &Value) -> Result<ProfileRecord, AggregateError> {
        let id = Identifier::from_value(input, self.id_range())?;
        self.assemble(id).await
    }
}

/// Build the aggregator selected by `strategy`.
pub fn build_aggregator(
    strategy: Strategy,
    range: IdRange,
    parallel: ParallelSources,
    chained: ChainedSources,
) -> Box<dyn ProfileAggregator> {
    match strategy {
        Strategy::Parallel => Box::new(ParallelAggregator::new(parallel, range)),
        Strategy::Chained => Box::new(ChainedAggregator::new(chained, range)),
    }
}
