//! Deterministic in-memory sources.
//!
//! Every record is derived from the identifier alone, after a fixed
//! simulated latency. Individual source kinds can be configured to always
//! fail so error paths can be exercised end to end.

use super::{
    AddressSource, CentralDirectory, ChainedSources, CompanySource, ParallelSources,
    ShardRegistry, ShardSource, SourceKind, UserSource, Vault,
};
use crate::config::SourcesConfig;
use crate::error::SourceError;
use crate::models::{
    AddressInfo, CompanyInfo, Geo, IdRange, Identifier, ShardInfo, UserBasic, VaultInfo,
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Shared state behind every mock source.
#[derive(Debug, Clone)]
pub struct MockSources {
    latency: Duration,
    records: IdRange,
    shard_names: Vec<String>,
    failing: BTreeSet<SourceKind>,
}

impl Default for MockSources {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(100),
            records: IdRange::default(),
            shard_names: vec!["db1".to_string(), "db2".to_string(), "db3".to_string()],
            failing: BTreeSet::new(),
        }
    }
}

impl MockSources {
    /// Build mocks from the `[sources]` config section.
    pub fn from_config(config: &SourcesConfig, records: IdRange) -> Self {
        let mocks = Self {
            records,
            ..Self::default()
        }
        .with_latency(Duration::from_millis(config.latency_ms))
        .with_shards(config.shards.iter().cloned());

        config
            .fail
            .iter()
            .fold(mocks, |mocks, kind| mocks.failing(*kind))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_shards<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shard_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Make every call to `kind` reject.
    pub fn failing(mut self, kind: SourceKind) -> Self {
        self.failing.insert(kind);
        self
    }

    /// Sources for the parallel topology.
    pub fn parallel(self: &Arc<Self>) -> ParallelSources {
        ParallelSources {
            user: self.clone(),
            address: self.clone(),
            company: self.clone(),
        }
    }

    /// Sources for the resolve-then-fetch topology, one mock shard per name.
    pub fn chained(self: &Arc<Self>) -> ChainedSources {
        let mut shards = ShardRegistry::new();
        for name in &self.shard_names {
            shards.insert(
                name.clone(),
                Arc::new(MockShard {
                    name: name.clone(),
                    inner: self.clone(),
                }),
            );
        }

        ChainedSources {
            central: self.clone(),
            shards,
            vault: self.clone(),
        }
    }

    /// Wait out the simulated latency, then apply failure rules.
    async fn simulate(&self, kind: SourceKind, id: Identifier) -> Result<(), SourceError> {
        debug!("{} lookup for id {}", kind, id);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failing.contains(&kind) {
            return Err(SourceError::Unavailable {
                kind,
                reason: "injected failure".to_string(),
            });
        }

        if !self.records.contains(i64::from(id.get())) {
            return Err(SourceError::NotFound { kind, id: id.get() });
        }

        Ok(())
    }
}

fn address_for(id: Identifier) -> AddressInfo {
    AddressInfo {
        street: format!("Street {}", id),
        suite: format!("Suite {}", id),
        city: format!("City {}", id),
        zipcode: format!("Zip{}", id),
        geo: Geo {
            lat: format!("{}0.0", id),
            lng: format!("{}0.0", id),
        },
    }
}

fn company_for(id: Identifier) -> CompanyInfo {
    CompanyInfo {
        name: format!("Company {}", id),
        catch_phrase: format!("CatchPhrase {}", id),
        bs: format!("BS {}", id),
    }
}

#[async_trait]
impl UserSource for MockSources {
    async fn fetch_user(&self, id: Identifier) -> Result<UserBasic, SourceError> {
        self.simulate(SourceKind::User, id).await?;
        Ok(UserBasic {
            id,
            name: format!("User{}", id),
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
        })
    }
}

#[async_trait]
impl AddressSource for MockSources {
    async fn fetch_address(&self, id: Identifier) -> Result<AddressInfo, SourceError> {
        self.simulate(SourceKind::Address, id).await?;
        Ok(address_for(id))
    }
}

#[async_trait]
impl CompanySource for MockSources {
    async fn fetch_company(&self, id: Identifier) -> Result<CompanyInfo, SourceError> {
        self.simulate(SourceKind::Company, id).await?;
        Ok(company_for(id))
    }
}

#[async_trait]
impl CentralDirectory for MockSources {
    async fn resolve(&self, id: Identifier) -> Result<String, SourceError> {
        self.simulate(SourceKind::Central, id).await?;

        if self.shard_names.is_empty() {
            return Err(SourceError::Unavailable {
                kind: SourceKind::Central,
                reason: "no shards configured".to_string(),
            });
        }

        let index = (id.get() as usize - 1) % self.shard_names.len();
        Ok(self.shard_names[index].clone())
    }
}

#[async_trait]
impl Vault for MockSources {
    async fn fetch_personal(&self, id: Identifier) -> Result<VaultInfo, SourceError> {
        self.simulate(SourceKind::Vault, id).await?;
        Ok(VaultInfo {
            name: format!("User{}", id),
            email: format!("user{}@example.com", id),
            address: address_for(id),
            phone: format!("Phone{}", id),
        })
    }
}

/// A named shard backed by the shared mock table.
struct MockShard {
    name: String,
    inner: Arc<MockSources>,
}

#[async_trait]
impl ShardSource for MockShard {
    async fn fetch_basic(&self, id: Identifier) -> Result<ShardInfo, SourceError> {
        debug!("Shard {} serving id {}", self.name, id);
        self.inner.simulate(SourceKind::Shard, id).await?;
        Ok(ShardInfo {
            username: format!("user{}", id),
            website: format!("website{}.com", id),
            company: company_for(id),
        })
    }
}
