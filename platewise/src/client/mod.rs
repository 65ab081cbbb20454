//! Entry point for reading and writing collections.
//!
//! - `Client` - owns the store handle and key prefix
//! - `CollectionHandle<T>` - typed CRUD over one collection
//! - cascade deletes and shallow population, driven by the entity descriptors
//!
//! # Example
//! ```ignore
//! let client = Client::memory("pw");
//! let post = client.collection::<Post>().create(input).await?;
//! let shown = client.collection::<Post>().get_populated(&post.id).await?;
//! ```

mod collection;
mod relations;

pub use collection::{CollectionHandle, ToggleOutcome};

use std::sync::Arc;

use crate::{
    errors::RepoError,
    registry,
    repository::{Collection, Repo},
    store::{DocumentStore, MemoryStore, RedisStore},
    types::{Entity, EntityDescriptor},
};

/// Deepest chain of cascading deletes followed before giving up.
pub const MAX_CASCADE_DEPTH: usize = 8;

#[derive(Clone)]
pub struct Client {
    store: Arc<dyn DocumentStore>,
    prefix: String,
}

impl Client {
    pub fn new(store: Arc<dyn DocumentStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Client over a fresh in-process store.
    pub fn memory(prefix: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryStore::new()), prefix)
    }

    /// Client over Redis at `url`.
    ///
    /// # Example
    /// ```ignore
    /// let client = Client::connect("redis://localhost:6379", "pw").await?;
    /// ```
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, RepoError> {
        let store = RedisStore::connect(url).await?;
        Ok(Self::new(Arc::new(store), prefix))
    }

    /// Typed handle for `T`'s collection.
    pub fn collection<T: Entity>(&self) -> CollectionHandle<T> {
        CollectionHandle::new(self.clone(), Repo::new(self.prefix.clone()))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub(crate) fn collection_for(&self, descriptor: &'static EntityDescriptor) -> Collection {
        Collection::new(self.prefix.clone(), descriptor)
    }

    /// Creates the search index of every registered collection.
    pub async fn ensure_indexes(&self) -> Result<(), RepoError> {
        let definitions: Vec<_> = registry::descriptors()
            .into_iter()
            .map(|descriptor| self.collection_for(descriptor).index_definition())
            .collect();
        self.store.prepare(&definitions).await?;
        log::info!("search indexes ready for {} collections", definitions.len());
        Ok(())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("prefix", &self.prefix).finish_non_exhaustive()
    }
}
