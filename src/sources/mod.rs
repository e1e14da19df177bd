//! Upstream data sources.
//!
//! Each collaborator is an async trait so aggregators can be handed mocks,
//! test doubles, or real clients.

pub mod mock;

use crate::error::SourceError;
use crate::models::{AddressInfo, CompanyInfo, Identifier, ShardInfo, UserBasic, VaultInfo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub use mock::MockSources;

/// Identifies one kind of upstream source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    User,
    Address,
    Company,
    Central,
    Shard,
    Vault,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::User => write!(f, "user source"),
            SourceKind::Address => write!(f, "address source"),
            SourceKind::Company => write!(f, "company source"),
            SourceKind::Central => write!(f, "central directory"),
            SourceKind::Shard => write!(f, "shard"),
            SourceKind::Vault => write!(f, "vault"),
        }
    }
}

#[async_trait]
pub trait UserSource: Send + Sync {
    async fn fetch_user(&self, id: Identifier) -> Result<UserBasic, SourceError>;
}

#[async_trait]
pub trait AddressSource: Send + Sync {
    async fn fetch_address(&self, id: Identifier) -> Result<AddressInfo, SourceError>;
}

#[async_trait]
pub trait CompanySource: Send + Sync {
    async fn fetch_company(&self, id: Identifier) -> Result<CompanyInfo, SourceError>;
}

/// Maps an identifier to the name of the shard holding its basic info.
#[async_trait]
pub trait CentralDirectory: Send + Sync {
    async fn resolve(&self, id: Identifier) -> Result<String, SourceError>;
}

/// One of several interchangeable basic-info stores.
#[async_trait]
pub trait ShardSource: Send + Sync {
    async fn fetch_basic(&self, id: Identifier) -> Result<ShardInfo, SourceError>;
}

/// Holder of sensitive personal fields.
#[async_trait]
pub trait Vault: Send + Sync {
    async fn fetch_personal(&self, id: Identifier) -> Result<VaultInfo, SourceError>;
}

/// Named set of shards, keyed by the names the central directory returns.
#[derive(Clone, Default)]
pub struct ShardRegistry {
    shards: BTreeMap<String, Arc<dyn ShardSource>>,
}

impl ShardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shard(mut self, name: impl Into<String>, shard: Arc<dyn ShardSource>) -> Self {
        self.insert(name, shard);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, shard: Arc<dyn ShardSource>) {
        self.shards.insert(name.into(), shard);
    }

    /// Look up a shard by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ShardSource>, SourceError> {
        self.shards
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::UnknownShard(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.shards.keys().map(String::as_str)
    }
}

/// Collaborators for the parallel topology.
#[derive(Clone)]
pub struct ParallelSources {
    pub user: Arc<dyn UserSource>,
    pub address: Arc<dyn AddressSource>,
    pub company: Arc<dyn CompanySource>,
}

/// Collaborators for the resolve-then-fetch topology.
#[derive(Clone)]
pub struct ChainedSources {
    pub central: Arc<dyn CentralDirectory>,
    pub shards: ShardRegistry,
    pub vault: Arc<dyn Vault>,
}
