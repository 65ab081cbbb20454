use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    errors::RepoError,
    keys::join_unique_values,
    runtime::commands::{
        AggregateKind, AggregateLink, AggregateRefresh, CounterIncrement, EntityDelete, EntityInsert, EntityLinks,
        EntityPatch, MutationCommand, MutationOutcome, MutationPlan, RefreshedAggregate, RelationToggle,
        ToggleAction, UniqueLink,
    },
    search::{IndexDefinition, Page, SearchParams},
    store::{DocumentStore, SearchTarget},
};

#[derive(Debug, Default)]
struct MemoryState {
    documents: HashMap<String, Value>,
    unique: HashMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
}

/// In-process store. Every command runs under one lock acquisition, which gives
/// it the same all-or-nothing behavior as a Lua script.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RepoError> {
        self.state
            .lock()
            .map_err(|_| RepoError::other("memory store lock poisoned"))
    }

    /// Number of stored documents under `prefix`.
    pub fn document_count(&self, prefix: &str) -> Result<usize, RepoError> {
        let state = self.lock()?;
        Ok(state.documents.keys().filter(|key| key.starts_with(prefix)).count())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn prepare(&self, _indexes: &[IndexDefinition]) -> Result<(), RepoError> {
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Option<Value>, RepoError> {
        Ok(self.lock()?.documents.get(key).cloned())
    }

    async fn fetch_many(&self, keys: &[String]) -> Result<Vec<Option<Value>>, RepoError> {
        let state = self.lock()?;
        Ok(keys.iter().map(|key| state.documents.get(key).cloned()).collect())
    }

    async fn exists(&self, key: &str) -> Result<bool, RepoError> {
        Ok(self.lock()?.documents.contains_key(key))
    }

    async fn members(&self, set_key: &str) -> Result<Vec<String>, RepoError> {
        Ok(self
            .lock()?
            .sets
            .get(set_key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn member_count(&self, set_key: &str) -> Result<u64, RepoError> {
        Ok(self.lock()?.sets.get(set_key).map_or(0, |set| set.len() as u64))
    }

    async fn lookup(&self, unique_key: &str) -> Result<Option<String>, RepoError> {
        Ok(self.lock()?.unique.get(unique_key).cloned())
    }

    async fn search(&self, target: &SearchTarget, params: &SearchParams) -> Result<Page<Value>, RepoError> {
        let state = self.lock()?;
        let mut matches: Vec<&Value> = state
            .documents
            .iter()
            .filter(|(key, _)| key.starts_with(&target.prefix))
            .map(|(_, document)| document)
            .filter(|document| params.matches(document))
            .collect();
        matches.sort_by(|left, right| params.compare(left, right));

        let items = matches
            .iter()
            .skip(usize::try_from(params.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(params.limit).unwrap_or(usize::MAX))
            .map(|document| (*document).clone())
            .collect();

        Ok(Page {
            items,
            total_record: matches.len() as u64,
            page: params.page,
            limit: params.limit,
        })
    }

    async fn execute(&self, plan: MutationPlan) -> Result<Vec<MutationOutcome>, RepoError> {
        let mut outcomes = Vec::with_capacity(plan.commands.len());
        for command in &plan.commands {
            let mut state = self.lock()?;
            let outcome = match command {
                MutationCommand::Insert(insert) => state.insert(insert),
                MutationCommand::Patch(patch) => state.patch(patch),
                MutationCommand::Delete(delete) => state.delete(delete),
                MutationCommand::Toggle(toggle) => state.toggle(toggle),
                MutationCommand::Refresh(refresh) => state.refresh(refresh),
                MutationCommand::Increment(increment) => state.increment(increment),
            }?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

fn parse_document(json: &str) -> Result<Value, RepoError> {
    serde_json::from_str(json).map_err(|err| RepoError::other(format!("failed to parse document: {err}")))
}

/// Key fragment for a linked value; `None` when the field is unset.
fn key_part(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn linked_key(prefix: &str, document: &Value, field: &str) -> Option<String> {
    key_part(document.get(field)).map(|part| format!("{prefix}{part}"))
}

fn unique_key(link: &UniqueLink, document: &Value) -> Option<(String, Vec<String>)> {
    let parts = link
        .fields
        .iter()
        .map(|field| key_part(document.get(field)))
        .collect::<Option<Vec<_>>>()?;
    let key = format!("{}{}", link.key_prefix, join_unique_values(&parts, link.case_insensitive));
    Some((key, parts))
}

fn path_field(path: &str) -> &str {
    path.strip_prefix("$.").unwrap_or(path)
}

impl MemoryState {
    fn check_references(&self, links: &EntityLinks, document: &Value, previous: Option<&Value>) -> Result<(), RepoError> {
        for reference in &links.references {
            let Some(target_id) = key_part(document.get(&reference.foreign_key)) else {
                continue;
            };
            let changed = previous.is_none_or(|prev| prev.get(&reference.foreign_key) != document.get(&reference.foreign_key));
            if changed && !self.documents.contains_key(&format!("{}{}", reference.key_prefix, target_id)) {
                return Err(RepoError::not_found(&reference.collection, target_id));
            }
        }
        Ok(())
    }

    fn check_unique(&self, links: &EntityLinks, document: &Value, entity_id: &str) -> Result<(), RepoError> {
        for link in &links.unique {
            if let Some((key, values)) = unique_key(link, document)
                && let Some(owner) = self.unique.get(&key)
                && owner != entity_id
            {
                return Err(RepoError::UniqueConstraintViolation {
                    fields: link.fields.clone(),
                    values,
                    existing_entity_id: owner.clone(),
                });
            }
        }
        Ok(())
    }

    fn reserve_unique(&mut self, links: &EntityLinks, document: &Value, entity_id: &str) {
        for link in &links.unique {
            if let Some((key, _)) = unique_key(link, document) {
                self.unique.insert(key, entity_id.to_string());
            }
        }
    }

    fn release_unique(&mut self, links: &EntityLinks, document: &Value, entity_id: &str) {
        for link in &links.unique {
            if let Some((key, _)) = unique_key(link, document)
                && self.unique.get(&key).is_some_and(|owner| owner == entity_id)
            {
                self.unique.remove(&key);
            }
        }
    }

    fn array_append(&mut self, key: &str, path: &str, entity_id: &str) {
        if let Some(Value::Array(items)) = self
            .documents
            .get_mut(key)
            .and_then(|document| document.get_mut(path_field(path)))
        {
            items.push(Value::String(entity_id.to_string()));
        }
    }

    fn array_remove(&mut self, key: &str, path: &str, entity_id: &str) {
        if let Some(Value::Array(items)) = self
            .documents
            .get_mut(key)
            .and_then(|document| document.get_mut(path_field(path)))
            && let Some(index) = items.iter().position(|item| item.as_str() == Some(entity_id))
        {
            items.remove(index);
        }
    }

    fn set_add(&mut self, key: String, entity_id: &str) {
        self.sets.entry(key).or_default().insert(entity_id.to_string());
    }

    fn set_remove(&mut self, key: &str, entity_id: &str) {
        if let Some(set) = self.sets.get_mut(key) {
            set.remove(entity_id);
            if set.is_empty() {
                self.sets.remove(key);
            }
        }
    }

    fn attach(&mut self, links: &EntityLinks, document: &Value, entity_id: &str) {
        for link in &links.memberships {
            if let Some(key) = linked_key(&link.set_prefix, document, &link.foreign_key) {
                self.set_add(key, entity_id);
            }
        }
        for link in &links.arrays {
            if let Some(key) = linked_key(&link.parent_prefix, document, &link.foreign_key) {
                self.array_append(&key, &link.path, entity_id);
            }
        }
    }

    fn detach(&mut self, links: &EntityLinks, document: &Value, entity_id: &str) {
        for link in &links.memberships {
            if let Some(key) = linked_key(&link.set_prefix, document, &link.foreign_key) {
                self.set_remove(&key, entity_id);
            }
        }
        for link in &links.arrays {
            if let Some(key) = linked_key(&link.parent_prefix, document, &link.foreign_key) {
                self.array_remove(&key, &link.path, entity_id);
            }
        }
    }

    fn relink(&mut self, links: &EntityLinks, previous: &Value, current: &Value, entity_id: &str) {
        for link in &links.memberships {
            let old_key = linked_key(&link.set_prefix, previous, &link.foreign_key);
            let new_key = linked_key(&link.set_prefix, current, &link.foreign_key);
            if old_key != new_key {
                if let Some(old_key) = old_key {
                    self.set_remove(&old_key, entity_id);
                }
                if let Some(new_key) = new_key {
                    self.set_add(new_key, entity_id);
                }
            }
        }
        for link in &links.arrays {
            let old_key = linked_key(&link.parent_prefix, previous, &link.foreign_key);
            let new_key = linked_key(&link.parent_prefix, current, &link.foreign_key);
            if old_key != new_key {
                if let Some(old_key) = old_key {
                    self.array_remove(&old_key, &link.path, entity_id);
                }
                if let Some(new_key) = new_key {
                    self.array_append(&new_key, &link.path, entity_id);
                }
            }
        }
    }

    fn aggregate_value(&self, link: &AggregateLink, parent_id: &str) -> Value {
        let members = self.sets.get(&format!("{}{}", link.set_prefix, parent_id));
        match &link.kind {
            AggregateKind::Count => Value::from(members.map_or(0, |set| set.len() as u64)),
            AggregateKind::Average { member_prefix, field } => {
                let values: Vec<f64> = members
                    .into_iter()
                    .flatten()
                    .filter_map(|member| self.documents.get(&format!("{member_prefix}{member}")))
                    .filter_map(|document| document.get(field).and_then(Value::as_f64))
                    .collect();
                if values.is_empty() {
                    return Value::from(0.0);
                }
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                Value::from((mean * 100.0).round() / 100.0)
            }
        }
    }

    fn refresh_one(&mut self, link: &AggregateLink, parent_id: &str, refreshed: &mut Vec<RefreshedAggregate>) {
        let parent_key = format!("{}{}", link.parent_prefix, parent_id);
        if !self.documents.contains_key(&parent_key) {
            return;
        }
        let value = self.aggregate_value(link, parent_id);
        let reported = value.as_f64().unwrap_or_default();
        if let Some(Value::Object(parent)) = self.documents.get_mut(&parent_key) {
            parent.insert(path_field(&link.path).to_string(), value);
        }
        refreshed.push(RefreshedAggregate {
            key: parent_key,
            path: link.path.clone(),
            value: reported,
        });
    }

    fn refresh_aggregates(&mut self, links: &EntityLinks, documents: &[&Value]) -> Vec<RefreshedAggregate> {
        let mut refreshed = Vec::new();
        let mut seen = HashSet::new();
        for link in &links.aggregates {
            for document in documents {
                let Some(parent_id) = key_part(document.get(&link.foreign_key)) else {
                    continue;
                };
                if seen.insert((link.parent_prefix.clone(), parent_id.clone(), link.path.clone())) {
                    self.refresh_one(link, &parent_id, &mut refreshed);
                }
            }
        }
        refreshed
    }

    fn store_new(&mut self, key: String, document: Value, links: &EntityLinks, entity_id: &str) -> Vec<RefreshedAggregate> {
        self.reserve_unique(links, &document, entity_id);
        self.documents.insert(key, document.clone());
        self.attach(links, &document, entity_id);
        self.refresh_aggregates(links, &[&document])
    }

    fn remove_existing(&mut self, key: &str, document: &Value, links: &EntityLinks, entity_id: &str) -> Vec<RefreshedAggregate> {
        self.release_unique(links, document, entity_id);
        self.detach(links, document, entity_id);
        self.documents.remove(key);
        self.refresh_aggregates(links, &[document])
    }

    fn insert(&mut self, command: &EntityInsert) -> Result<MutationOutcome, RepoError> {
        if self.documents.contains_key(&command.key) {
            return Err(RepoError::UniqueConstraintViolation {
                fields: vec!["id".to_string()],
                values: vec![command.entity_id.clone()],
                existing_entity_id: command.entity_id.clone(),
            });
        }
        let document = parse_document(&command.document_json)?;
        self.check_references(&command.links, &document, None)?;
        self.check_unique(&command.links, &document, &command.entity_id)?;

        let refreshed = self.store_new(command.key.clone(), document.clone(), &command.links, &command.entity_id);
        Ok(MutationOutcome {
            document: Some(document),
            refreshed,
            ..MutationOutcome::default()
        })
    }

    fn patch(&mut self, command: &EntityPatch) -> Result<MutationOutcome, RepoError> {
        let previous = self
            .documents
            .get(&command.key)
            .cloned()
            .ok_or_else(|| RepoError::not_found(&command.collection, &command.entity_id))?;

        let mut current = previous.clone();
        if let Value::Object(fields) = &mut current {
            for assignment in &command.assignments {
                fields.insert(assignment.field.clone(), assignment.value());
            }
        }

        self.check_references(&command.links, &current, Some(&previous))?;
        self.check_unique(&command.links, &current, &command.entity_id)?;

        self.documents.insert(command.key.clone(), current.clone());
        for link in &command.links.unique {
            let old_key = unique_key(link, &previous).map(|(key, _)| key);
            let new_key = unique_key(link, &current).map(|(key, _)| key);
            if old_key != new_key {
                if let Some(old_key) = old_key
                    && self.unique.get(&old_key).is_some_and(|owner| owner == &command.entity_id)
                {
                    self.unique.remove(&old_key);
                }
                if let Some(new_key) = new_key {
                    self.unique.insert(new_key, command.entity_id.clone());
                }
            }
        }
        self.relink(&command.links, &previous, &current, &command.entity_id);
        let refreshed = self.refresh_aggregates(&command.links, &[&previous, &current]);

        // aggregates may have rewritten the patched document itself
        let document = self.documents.get(&command.key).cloned().unwrap_or(current);
        Ok(MutationOutcome {
            document: Some(document),
            refreshed,
            ..MutationOutcome::default()
        })
    }

    fn delete(&mut self, command: &EntityDelete) -> Result<MutationOutcome, RepoError> {
        let document = self
            .documents
            .get(&command.key)
            .cloned()
            .ok_or_else(|| RepoError::not_found(&command.collection, &command.entity_id))?;

        for dependent in &command.dependents {
            if self.sets.get(&dependent.set_key).is_some_and(|set| !set.is_empty()) {
                return Err(RepoError::Restricted {
                    collection: command.collection.clone(),
                    entity_id: command.entity_id.clone(),
                    dependents: dependent.collection.clone(),
                });
            }
        }

        let refreshed = self.remove_existing(&command.key, &document, &command.links, &command.entity_id);
        for set_key in &command.owned_sets {
            self.sets.remove(set_key);
        }
        Ok(MutationOutcome {
            document: Some(document),
            refreshed,
            ..MutationOutcome::default()
        })
    }

    fn toggle(&mut self, command: &RelationToggle) -> Result<MutationOutcome, RepoError> {
        if let Some(owner) = self.unique.get(&command.pair_key).cloned() {
            let key = format!("{}{}", command.key_prefix, owner);
            if let Some(document) = self.documents.get(&key).cloned() {
                let refreshed = self.remove_existing(&key, &document, &command.links, &owner);
                return Ok(MutationOutcome {
                    action: Some(ToggleAction::Removed),
                    document: Some(document),
                    refreshed,
                    value: None,
                });
            }
            self.unique.remove(&command.pair_key);
        }

        let document = parse_document(&command.document_json)?;
        self.check_references(&command.links, &document, None)?;
        self.check_unique(&command.links, &document, &command.entity_id)?;

        let key = format!("{}{}", command.key_prefix, command.entity_id);
        let refreshed = self.store_new(key, document.clone(), &command.links, &command.entity_id);
        Ok(MutationOutcome {
            action: Some(ToggleAction::Added),
            document: Some(document),
            refreshed,
            value: None,
        })
    }

    fn refresh(&mut self, command: &AggregateRefresh) -> Result<MutationOutcome, RepoError> {
        let link = &command.aggregate;
        if !self.documents.contains_key(&format!("{}{}", link.parent_prefix, command.parent_id)) {
            return Err(RepoError::not_found(&command.collection, &command.parent_id));
        }
        let mut refreshed = Vec::new();
        self.refresh_one(link, &command.parent_id, &mut refreshed);
        Ok(MutationOutcome {
            refreshed,
            ..MutationOutcome::default()
        })
    }

    fn increment(&mut self, command: &CounterIncrement) -> Result<MutationOutcome, RepoError> {
        let document = self
            .documents
            .get_mut(&command.key)
            .ok_or_else(|| RepoError::not_found(&command.collection, &command.entity_id))?;
        let field = path_field(&command.path);
        let current = document.get(field).cloned().unwrap_or(Value::from(0));
        let next = match current.as_i64() {
            Some(whole) => Value::from(whole + command.by),
            None => Value::from(current.as_f64().unwrap_or_default() + command.by as f64),
        };
        let reported = next.as_f64();
        if let Value::Object(fields) = document {
            fields.insert(field.to_string(), next);
        }
        Ok(MutationOutcome {
            value: reported,
            ..MutationOutcome::default()
        })
    }
}
