//! Document storage backends.
//!
//! The repository layer talks to a [`DocumentStore`]: point reads, reverse-relation
//! reads, unique-key lookups, paged search, and atomic mutation commands. Redis is
//! the production backend; [`MemoryStore`] implements the same command semantics
//! in-process.

mod memory;
mod redis_store;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    errors::RepoError,
    runtime::{MutationOutcome, MutationPlan},
    search::{IndexDefinition, Page, SearchParams},
};

pub use memory::MemoryStore;
pub use redis_store::{RedisStore, cleanup_pattern};

/// Where a collection's documents live and how they are indexed.
#[derive(Debug, Clone)]
pub struct SearchTarget {
    pub index: String,
    pub prefix: String,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates whatever the backend needs before serving (search indexes).
    async fn prepare(&self, indexes: &[IndexDefinition]) -> Result<(), RepoError>;

    async fn fetch(&self, key: &str) -> Result<Option<Value>, RepoError>;

    /// Results are positionally aligned with `keys`.
    async fn fetch_many(&self, keys: &[String]) -> Result<Vec<Option<Value>>, RepoError>;

    async fn exists(&self, key: &str) -> Result<bool, RepoError>;

    async fn members(&self, set_key: &str) -> Result<Vec<String>, RepoError>;

    async fn member_count(&self, set_key: &str) -> Result<u64, RepoError>;

    /// Id holding a unique reservation, if any.
    async fn lookup(&self, unique_key: &str) -> Result<Option<String>, RepoError>;

    async fn search(&self, target: &SearchTarget, params: &SearchParams) -> Result<Page<Value>, RepoError>;

    /// Runs the plan command by command; each command is atomic on its own.
    async fn execute(&self, plan: MutationPlan) -> Result<Vec<MutationOutcome>, RepoError>;
}
