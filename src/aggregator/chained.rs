//! Resolve-then-fetch over a central directory, named shards and a vault.

use super::ProfileAggregator;
use crate::error::{AggregateError, SourceError};
use crate::models::{IdRange, Identifier, ProfileRecord};
use crate::sources::ChainedSources;
use async_trait::async_trait;
use tracing::{debug, warn};

pub struct ChainedAggregator {
    sources: ChainedSources,
    range: IdRange,
}

impl ChainedAggregator {
    pub fn new(sources: ChainedSources, range: IdRange) -> Self {
        Self { sources, range }
    }

    async fn lookup(&self, id: Identifier) -> Result<ProfileRecord, SourceError> {
        let shard_name = self.sources.central.resolve(id).await?;
        debug!("Id {} lives on shard {}", id, shard_name);

        let shard = self.sources.shards.get(&shard_name).map_err(|e| {
            let known: Vec<&str> = self.sources.shards.names().collect();
            debug!("Registered shards: {}", known.join(", "));
            e
        })?;

        // Shard and vault only need the resolved name, not each other.
        let (basic, personal) = futures::try_join!(
            shard.fetch_basic(id),
            self.sources.vault.fetch_personal(id)
        )?;

        Ok(ProfileRecord::from_shard_and_vault(id, basic, personal))
    }
}

#[async_trait]
impl ProfileAggregator for ChainedAggregator {
    fn id_range(&self) -> IdRange {
        self.range
    }

    async fn assemble(&self, id: Identifier) -> Result<ProfileRecord, AggregateError> {
        self.lookup(id).await.map_err(|cause| {
            warn!("Lookup chain failed for id {}: {}", id, cause);
            AggregateError::AggregationFailure { cause }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ShardInfo, VaultInfo};
    use crate::sources::{
        CentralDirectory, MockSources, ShardRegistry, ShardSource, SourceKind, Vault,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn mock_aggregator(mocks: MockSources) -> ChainedAggregator {
        let mocks = Arc::new(mocks.with_latency(Duration::ZERO));
        ChainedAggregator::new(mocks.chained(), IdRange::default())
    }

    /// Wraps the mocks and records the order in which sources are called.
    struct Recorder {
        inner: Arc<MockSources>,
        log: Mutex<Vec<&'static str>>,
        central_error: Option<String>,
    }

    impl Recorder {
        fn new(central_error: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                inner: Arc::new(MockSources::default().with_latency(Duration::ZERO)),
                log: Mutex::new(Vec::new()),
                central_error: central_error.map(String::from),
            })
        }

        fn push(&self, entry: &'static str) {
            self.log.lock().unwrap().push(entry);
        }

        fn entries(&self) -> Vec<&'static str> {
            self.log.lock().unwrap().clone()
        }

        fn sources(self: &Arc<Self>) -> ChainedSources {
            ChainedSources {
                central: self.clone(),
                shards: ShardRegistry::new().with_shard("db1", self.clone()),
                vault: self.clone(),
            }
        }
    }

    #[async_trait]
    impl CentralDirectory for Recorder {
        async fn resolve(&self, _id: Identifier) -> Result<String, SourceError> {
            self.push("central");
            match &self.central_error {
                Some(reason) => Err(SourceError::Unavailable {
                    kind: SourceKind::Central,
                    reason: reason.clone(),
                }),
                None => Ok("db1".to_string()),
            }
        }
    }

    #[async_trait]
    impl ShardSource for Recorder {
        async fn fetch_basic(&self, id: Identifier) -> Result<ShardInfo, SourceError> {
            self.push("shard");
            self.inner.chained().shards.get("db1")?.fetch_basic(id).await
        }
    }

    #[async_trait]
    impl Vault for Recorder {
        async fn fetch_personal(&self, id: Identifier) -> Result<VaultInfo, SourceError> {
            self.push("vault");
            self.inner.fetch_personal(id).await
        }
    }

    #[tokio::test]
    async fn test_merges_shard_and_vault() {
        let record = mock_aggregator(MockSources::default())
            .get_user_data(4)
            .await
            .unwrap();

        assert_eq!(record.id.get(), 4);
        assert_eq!(record.name, "User4");
        assert_eq!(record.username, "user4");
        assert_eq!(record.email, "user4@example.com");
        assert_eq!(record.phone, "Phone4");
        assert_eq!(record.website, "website4.com");
        assert_eq!(record.address.city, "City 4");
        assert_eq!(record.company.bs, "BS 4");
    }

    #[tokio::test]
    async fn test_resolve_runs_first() {
        let recorder = Recorder::new(None);
        let aggregator = ChainedAggregator::new(recorder.sources(), IdRange::default());

        aggregator.get_user_data(1).await.unwrap();

        let log = recorder.entries();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], "central");
        assert!(log.contains(&"shard"));
        assert!(log.contains(&"vault"));
    }

    #[tokio::test]
    async fn test_central_failure_message_is_preserved() {
        let recorder = Recorder::new(Some("directory offline"));
        let aggregator = ChainedAggregator::new(recorder.sources(), IdRange::default());

        let err = aggregator.get_user_data(2).await.unwrap_err();

        assert!(matches!(err, AggregateError::AggregationFailure { .. }));
        assert!(err.to_string().starts_with("Error retrieving data: "));
        assert!(err.to_string().contains("directory offline"));
        assert_eq!(recorder.entries(), vec!["central"]);
    }

    #[tokio::test]
    async fn test_invalid_id_skips_sources() {
        let recorder = Recorder::new(None);
        let aggregator = ChainedAggregator::new(recorder.sources(), IdRange::default());

        for bad in [-1, 11] {
            let err = aggregator.get_user_data(bad).await.unwrap_err();
            assert!(matches!(err, AggregateError::InvalidIdentifier { .. }));
        }
        assert!(recorder.entries().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_shard() {
        // Central hands out db1..db3, but only db1 and db2 are registered.
        let mocks = Arc::new(MockSources::default().with_latency(Duration::ZERO));
        let mut sources = mocks.chained();
        sources.shards = ShardRegistry::new()
            .with_shard("db1", sources.shards.get("db1").unwrap())
            .with_shard("db2", sources.shards.get("db2").unwrap());
        let aggregator = ChainedAggregator::new(sources, IdRange::default());

        assert!(aggregator.get_user_data(2).await.is_ok());
        let err = aggregator.get_user_data(3).await.unwrap_err();
        assert_eq!(err.to_string(), "Error retrieving data: unknown shard 'db3'");
    }

    #[tokio::test]
    async fn test_vault_failure() {
        let err = mock_aggregator(MockSources::default().failing(SourceKind::Vault))
            .get_user_data(1)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error retrieving data: vault unavailable: injected failure"
        );
    }

    #[tokio::test]
    async fn test_shard_failure() {
        let err = mock_aggregator(MockSources::default().failing(SourceKind::Shard))
            .get_user_data(6)
            .await
            .unwrap_err();
        assert!(matches!(
            err.cause(),
            Some(SourceError::Unavailable {
                kind: SourceKind::Shard,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_wider_range_reaches_central() {
        // The aggregator accepts 11 here, so rejection comes from the source.
        let mocks = Arc::new(MockSources::default().with_latency(Duration::ZERO));
        let aggregator = ChainedAggregator::new(mocks.chained(), IdRange::new(1, 20));

        let err = aggregator.get_user_data(11).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error retrieving data: central directory has no record for id 11"
        );
    }
}
