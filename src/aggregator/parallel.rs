//! Parallel fan-out over independent user, address and company sources.

use super::ProfileAggregator;
use crate::error::AggregateError;
use crate::models::{IdRange, Identifier, ProfileRecord};
use crate::sources::ParallelSources;
use async_trait::async_trait;
use tracing::{debug, warn};

pub struct ParallelAggregator {
    sources: ParallelSources,
    range: IdRange,
}

impl ParallelAggregator {
    pub fn new(sources: ParallelSources, range: IdRange) -> Self {
        Self { sources, range }
    }
}

#[async_trait]
impl ProfileAggregator for ParallelAggregator {
    fn id_range(&self) -> IdRange {
        self.range
    }

    async fn assemble(&self, id: Identifier) -> Result<ProfileRecord, AggregateError> {
        debug!("Fetching user, address and company for id {}", id);

        // All three are polled together; the first error drops the rest.
        let joined = futures::try_join!(
            self.sources.user.fetch_user(id),
            self.sources.address.fetch_address(id),
            self.sources.company.fetch_company(id)
        );

        let (user, address, company) = joined.map_err(|cause| {
            warn!("Fetch failed for id {}: {}", id, cause);
            AggregateError::FetchFailure { cause }
        })?;

        Ok(ProfileRecord::from_parts(user, address, company))
    }
}
