use std::{future::Future, pin::Pin};

use chrono::Utc;
use serde_json::Value;

use crate::{
    client::{Client, MAX_CASCADE_DEPTH},
    errors::RepoError,
    registry::{self, IncomingRelation},
    repository::{PatchOperation, present_document},
    runtime::MutationPlan,
    types::{CascadePolicy, EntityDescriptor},
};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

impl Client {
    /// Deletes `entity_id` and applies every incoming relation's policy first.
    /// Returns the removed document as stored.
    pub(crate) async fn delete_document(
        &self,
        descriptor: &'static EntityDescriptor,
        entity_id: &str,
    ) -> Result<Value, RepoError> {
        self.delete_cascade(descriptor, entity_id, 0).await
    }

    fn delete_cascade<'a>(
        &'a self,
        descriptor: &'static EntityDescriptor,
        entity_id: &'a str,
        depth: usize,
    ) -> BoxFuture<'a, Result<Value, RepoError>> {
        Box::pin(async move {
            if depth > MAX_CASCADE_DEPTH {
                return Err(RepoError::other(format!(
                    "cascade from {} '{entity_id}' exceeded depth {MAX_CASCADE_DEPTH}",
                    descriptor.collection
                )));
            }
            let collection = self.collection_for(descriptor);
            let delete = collection.delete_command(entity_id)?;
            if !self.store.exists(&collection.entity_key(entity_id)).await? {
                return Err(RepoError::not_found(descriptor.collection, entity_id));
            }

            let incoming = registry::find_incoming_relations(descriptor.collection);
            for dependent in incoming
                .iter()
                .filter(|incoming| incoming.relation.on_target_delete == CascadePolicy::Restrict)
            {
                if self.store.member_count(&self.reverse_set(dependent, entity_id)).await? > 0 {
                    return Err(RepoError::Restricted {
                        collection: descriptor.collection.to_string(),
                        entity_id: entity_id.to_string(),
                        dependents: dependent.source.collection.to_string(),
                    });
                }
            }

            for dependent in &incoming {
                let children = self.store.members(&self.reverse_set(dependent, entity_id)).await?;
                match dependent.relation.on_target_delete {
                    CascadePolicy::Delete => {
                        for child_id in &children {
                            match self.delete_cascade(dependent.source, child_id, depth + 1).await {
                                // already gone through another path
                                Err(err) if err.is_not_found() => {}
                                other => {
                                    other?;
                                }
                            }
                        }
                    }
                    CascadePolicy::Detach => {
                        let source = self.collection_for(dependent.source);
                        let mut plan = MutationPlan::new();
                        for child_id in &children {
                            plan.push(source.patch_command(
                                child_id,
                                vec![PatchOperation::assign(dependent.relation.foreign_key, Value::Null)],
                                Utc::now(),
                            )?);
                        }
                        if !plan.is_empty() {
                            self.store.execute(plan).await?;
                        }
                    }
                    CascadePolicy::Restrict => {}
                }
                if !children.is_empty() {
                    log::info!(
                        "{:?} {} {} of {} '{entity_id}'",
                        dependent.relation.on_target_delete,
                        children.len(),
                        dependent.source.collection,
                        descriptor.collection
                    );
                }
            }

            self.store
                .execute(MutationPlan::single(delete))
                .await?
                .pop()
                .ok_or_else(|| RepoError::other("store returned no outcome for delete"))?
                .into_document()
        })
    }

    fn reverse_set(&self, incoming: &IncomingRelation, parent_id: &str) -> String {
        self.collection_for(incoming.source)
            .keys()
            .reverse_relation(incoming.source.collection, incoming.relation.alias, parent_id)
    }

    /// Shallow join: each belongs-to relation is resolved under its alias and
    /// each has-many id array is replaced by the referenced documents.
    pub(crate) async fn populate(
        &self,
        descriptor: &'static EntityDescriptor,
        document: Value,
    ) -> Result<Value, RepoError> {
        let mut document = present_document(descriptor, document);

        for relation in descriptor.relations {
            let Some(target) = registry::get_descriptor(relation.target) else {
                continue;
            };
            let Some(target_id) = document.get(relation.foreign_key).and_then(Value::as_str) else {
                continue;
            };
            let key = self.collection_for(target).entity_key(target_id);
            let resolved = self
                .store
                .fetch(&key)
                .await?
                .and_then(|found| relation.populate.apply(&present_document(target, found)));
            if let Value::Object(fields) = &mut document {
                fields.insert(relation.alias.to_string(), resolved.unwrap_or(Value::Null));
            }
        }

        for has_many in descriptor.has_many {
            let Some(target) = registry::get_descriptor(has_many.target) else {
                continue;
            };
            let ids: Vec<String> = document
                .get(has_many.field)
                .and_then(Value::as_array)
                .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default();
            let target_collection = self.collection_for(target);
            let keys: Vec<String> = ids.iter().map(|id| target_collection.entity_key(id)).collect();
            let resolved: Vec<Value> = if keys.is_empty() {
                Vec::new()
            } else {
                self.store
                    .fetch_many(&keys)
                    .await?
                    .into_iter()
                    .flatten()
                    .filter_map(|found| has_many.populate.apply(&present_document(target, found)))
                    .collect()
            };
            if let Value::Object(fields) = &mut document {
                fields.insert(has_many.field.to_string(), Value::Array(resolved));
            }
        }

        Ok(document)
    }
}
