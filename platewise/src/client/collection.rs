use chrono::Utc;
use serde_json::Value;

use crate::{
    client::Client,
    errors::RepoError,
    id::{ensure_well_formed_id, generate_entity_id},
    repository::{CREATED_AT_MIRROR, CreateInput, PatchInput, PatchOperation, Repo},
    runtime::{
        MutationCommand, MutationOutcome, MutationPlan, ToggleAction,
        commands::RefreshedAggregate,
    },
    search::{ListQuery, Page},
    types::Entity,
};

/// Result of flipping a pair relation.
#[derive(Debug, Clone)]
pub struct ToggleOutcome<T> {
    pub action: ToggleAction,
    /// The created record, or the removed one.
    pub record: T,
    /// Parent values rewritten in the same command.
    pub refreshed: Vec<RefreshedAggregate>,
}

/// Typed CRUD over one collection.
pub struct CollectionHandle<T> {
    client: Client,
    repo: Repo<T>,
}

impl<T: Entity> CollectionHandle<T> {
    pub(crate) fn new(client: Client, repo: Repo<T>) -> Self {
        Self { client, repo }
    }

    pub fn repo(&self) -> &Repo<T> {
        &self.repo
    }

    fn name(&self) -> &'static str {
        self.repo.collection().name()
    }

    async fn run_one(&self, command: MutationCommand) -> Result<MutationOutcome, RepoError> {
        self.client
            .store()
            .execute(MutationPlan::single(command))
            .await?
            .pop()
            .ok_or_else(|| RepoError::other(format!("store returned no outcome for {}", self.name())))
    }

    pub async fn list(&self, query: ListQuery) -> Result<Page<T>, RepoError> {
        let params = query.into_params(T::descriptor())?;
        let page = self
            .client
            .store()
            .search(&self.repo.collection().search_target(), &params)
            .await?;
        page.try_map(|document| self.repo.decode(document))
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, RepoError> {
        ensure_well_formed_id("id", id)?;
        let key = self.repo.collection().entity_key(id);
        self.client
            .store()
            .fetch(&key)
            .await?
            .map(|document| self.repo.decode(document))
            .transpose()
    }

    pub async fn get_or_error(&self, id: &str) -> Result<T, RepoError> {
        self.get(id)
            .await?
            .ok_or_else(|| RepoError::not_found(self.name(), id))
    }

    /// The presented record with its relations resolved.
    pub async fn get_populated(&self, id: &str) -> Result<Value, RepoError> {
        ensure_well_formed_id("id", id)?;
        let key = self.repo.collection().entity_key(id);
        let document = self
            .client
            .store()
            .fetch(&key)
            .await?
            .ok_or_else(|| RepoError::not_found(self.name(), id))?;
        self.client.populate(T::descriptor(), document).await
    }

    pub async fn exists(&self, id: &str) -> Result<bool, RepoError> {
        ensure_well_formed_id("id", id)?;
        self.client.store().exists(&self.repo.collection().entity_key(id)).await
    }

    pub async fn create<I>(&self, input: I) -> Result<T, RepoError>
    where
        I: CreateInput<Entity = T>,
    {
        let entity = input.into_entity(generate_entity_id(), Utc::now())?;
        self.insert(&entity).await
    }

    pub async fn insert(&self, entity: &T) -> Result<T, RepoError> {
        let command = self.repo.insert_command(entity)?;
        let document = self.run_one(command).await?.into_document()?;
        log::info!("created {} '{}'", self.name(), entity.id());
        self.repo.decode(document)
    }

    pub async fn update<P>(&self, id: &str, patch: P) -> Result<T, RepoError>
    where
        P: PatchInput<Entity = T>,
    {
        self.patch(id, patch.into_operations()?).await
    }

    /// Applies `operations`; with none, returns the record unchanged.
    pub async fn patch(&self, id: &str, operations: Vec<PatchOperation>) -> Result<T, RepoError> {
        if operations.is_empty() {
            return self.get_or_error(id).await;
        }
        let command = self.repo.collection().patch_command(id, operations, Utc::now())?;
        let document = self.run_one(command).await?.into_document()?;
        log::info!("updated {} '{id}'", self.name());
        self.repo.decode(document)
    }

    /// Deletes the record after applying the cascade policy of everything
    /// pointing at it; returns its last state.
    pub async fn delete(&self, id: &str) -> Result<T, RepoError> {
        let document = self.client.delete_document(T::descriptor(), id).await?;
        log::info!("deleted {} '{id}'", self.name());
        self.repo.decode(document)
    }

    /// Inserts `entity` unless its pair already exists, in which case the
    /// existing record is removed instead.
    pub async fn toggle(&self, entity: &T) -> Result<ToggleOutcome<T>, RepoError> {
        let command = self.repo.toggle_command(entity)?;
        let outcome = self.run_one(command).await?;
        let action = outcome
            .action
            .ok_or_else(|| RepoError::other("toggle did not report an action"))?;
        let refreshed = outcome.refreshed.clone();
        let record = self.repo.decode(outcome.into_document()?)?;
        Ok(ToggleOutcome {
            action,
            record,
            refreshed,
        })
    }

    /// Recomputes `target_field` on `parent_id` from this collection's members.
    pub async fn refresh(&self, target_field: &str, parent_id: &str) -> Result<f64, RepoError> {
        let command = self.repo.collection().refresh_command(target_field, parent_id)?;
        let outcome = self.run_one(command).await?;
        outcome
            .refreshed
            .first()
            .map(|entry| entry.value)
            .ok_or_else(|| RepoError::other(format!("{target_field} was not refreshed")))
    }

    /// Adds `by` to a numeric field and returns the new value.
    pub async fn increment(&self, id: &str, field: &str, by: i64) -> Result<f64, RepoError> {
        let command = self.repo.collection().increment_command(id, field, by)?;
        self.run_one(command)
            .await?
            .value
            .ok_or_else(|| RepoError::other(format!("{field} is not numeric")))
    }

    /// Number of records whose `alias` relation points at `parent_id`.
    pub async fn count_related(&self, alias: &str, parent_id: &str) -> Result<u64, RepoError> {
        ensure_well_formed_id("id", parent_id)?;
        let set_key = self.repo.collection().reverse_set_key(alias, parent_id)?;
        self.client.store().member_count(&set_key).await
    }

    pub async fn related_ids(&self, alias: &str, parent_id: &str) -> Result<Vec<String>, RepoError> {
        ensure_well_formed_id("id", parent_id)?;
        let set_key = self.repo.collection().reverse_set_key(alias, parent_id)?;
        self.client.store().members(&set_key).await
    }

    /// Records whose `alias` relation points at `parent_id`, newest first.
    pub async fn related(&self, alias: &str, parent_id: &str) -> Result<Vec<T>, RepoError> {
        let collection = self.repo.collection();
        let keys: Vec<String> = self
            .related_ids(alias, parent_id)
            .await?
            .iter()
            .map(|id| collection.entity_key(id))
            .collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut documents: Vec<Value> = self.client.store().fetch_many(&keys).await?.into_iter().flatten().collect();
        let created = |document: &Value| document.get(CREATED_AT_MIRROR).and_then(Value::as_i64);
        documents.sort_by(|left, right| created(right).cmp(&created(left)));
        documents.into_iter().map(|document| self.repo.decode(document)).collect()
    }

    /// Record holding the unique reservation for `values` over `fields`.
    pub async fn find_by_unique(&self, fields: &[&str], values: &[&str]) -> Result<Option<T>, RepoError> {
        let key = self.repo.collection().unique_key(fields, values)?;
        match self.client.store().lookup(&key).await? {
            Some(owner) => self.get(&owner).await,
            None => Ok(None),
        }
    }

    /// Stored form minus hidden and store-only fields.
    pub fn present(&self, entity: &T) -> Result<Value, RepoError> {
        self.repo.present(entity)
    }

    /// Presented record with its relations resolved.
    pub async fn populate(&self, entity: &T) -> Result<Value, RepoError> {
        self.client.populate(T::descriptor(), self.repo.encode(entity)?).await
    }
}
