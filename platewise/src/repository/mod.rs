use std::{borrow::Cow, marker::PhantomData};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
    errors::{RepoError, ValidationError, ValidationIssue},
    id::ensure_well_formed_id,
    keys::{KeyContext, join_unique_values},
    registry,
    runtime::commands::{
        AggregateKind, AggregateLink, AggregateRefresh, ArrayLink, CounterIncrement, DependentCheck, EntityDelete,
        EntityInsert, EntityLinks, EntityPatch, FieldAssignment, MembershipLink, MutationCommand, ReferenceLink,
        RelationToggle, UniqueLink,
    },
    search::{BASE_INDEX, IndexDefinition},
    store::SearchTarget,
    types::{AggregateMeasure, CascadePolicy, Entity, EntityDescriptor},
    validators::{validate_entity_json, validate_field_assignment},
};

pub const CREATED_AT_MIRROR: &str = "created_at_ts";
pub const UPDATED_AT_MIRROR: &str = "updated_at_ts";
const IMMUTABLE_FIELDS: [&str; 2] = ["id", "created_at"];

/// Assignment of one top-level field; `Value::Null` clears an optional field.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOperation {
    pub field: String,
    pub value: Value,
}

impl PatchOperation {
    pub fn assign(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}

/// Collects the fields a partial update actually supplies.
#[derive(Debug, Default)]
pub struct PatchBuilder {
    operations: Vec<PatchOperation>,
}

impl PatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `field` when a value was supplied.
    pub fn set<V: Serialize>(mut self, field: &str, value: Option<V>) -> Result<Self, RepoError> {
        if let Some(value) = value {
            self.operations.push(PatchOperation::assign(field, encode_value(field, &value)?));
        }
        Ok(self)
    }

    /// Like [`set`](Self::set), but an explicit `null` clears the field.
    pub fn set_nullable<V: Serialize>(mut self, field: &str, value: Option<Option<V>>) -> Result<Self, RepoError> {
        match value {
            Some(Some(value)) => self.operations.push(PatchOperation::assign(field, encode_value(field, &value)?)),
            Some(None) => self.operations.push(PatchOperation::assign(field, Value::Null)),
            None => {}
        }
        Ok(self)
    }

    pub fn build(self) -> Vec<PatchOperation> {
        self.operations
    }
}

fn encode_value<V: Serialize>(field: &str, value: &V) -> Result<Value, RepoError> {
    serde_json::to_value(value).map_err(|err| {
        RepoError::Validation(ValidationError::single(
            field,
            "serialization_error",
            format!("failed to encode value: {err}"),
        ))
    })
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Request payload that creates a new entity.
pub trait CreateInput: DeserializeOwned + Send + 'static {
    type Entity: Entity;

    fn into_entity(self, id: String, now: DateTime<Utc>) -> Result<Self::Entity, RepoError>;
}

/// Request payload for a partial update; absent fields stay untouched.
pub trait PatchInput: DeserializeOwned + Send + 'static {
    type Entity: Entity;

    fn into_operations(self) -> Result<Vec<PatchOperation>, RepoError>;
}

/// Keys, links and mutation commands for one collection.
#[derive(Debug, Clone)]
pub struct Collection {
    prefix: String,
    descriptor: &'static EntityDescriptor,
}

impl Collection {
    pub fn new(prefix: impl Into<String>, descriptor: &'static EntityDescriptor) -> Self {
        Self {
            prefix: prefix.into(),
            descriptor,
        }
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.collection
    }

    pub fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix)
    }

    pub fn entity_key(&self, entity_id: &str) -> String {
        self.keys().entity(self.descriptor.collection, entity_id)
    }

    pub fn search_target(&self) -> SearchTarget {
        SearchTarget {
            index: self.keys().search_index(self.descriptor.collection),
            prefix: self.keys().entity_prefix(self.descriptor.collection),
        }
    }

    pub fn index_definition(&self) -> IndexDefinition {
        IndexDefinition {
            name: self.keys().search_index(self.descriptor.collection),
            prefix: self.keys().entity_prefix(self.descriptor.collection),
            schema: BASE_INDEX.iter().chain(self.descriptor.index).copied().collect(),
        }
    }

    /// Set of ids in this collection whose `alias` relation points at `parent_id`.
    pub fn reverse_set_key(&self, alias: &str, parent_id: &str) -> Result<String, RepoError> {
        if self.descriptor.relation(alias).is_none() {
            return Err(RepoError::other(format!(
                "{} has no relation named {alias}",
                self.descriptor.collection
            )));
        }
        Ok(self.keys().reverse_relation(self.descriptor.collection, alias, parent_id))
    }

    /// Reservation key of the unique constraint over exactly `fields`.
    pub fn unique_key(&self, fields: &[&str], values: &[&str]) -> Result<String, RepoError> {
        let constraint = self
            .descriptor
            .unique_constraints
            .iter()
            .find(|constraint| constraint.fields == fields)
            .ok_or_else(|| {
                RepoError::other(format!(
                    "{} has no unique constraint over {fields:?}",
                    self.descriptor.collection
                ))
            })?;
        let values: Vec<String> = values.iter().map(|value| value.to_string()).collect();
        Ok(format!(
            "{}{}",
            self.keys().unique_prefix(self.descriptor.collection, constraint.fields),
            join_unique_values(&values, constraint.case_insensitive)
        ))
    }

    pub fn links(&self) -> EntityLinks {
        let keys = self.keys();
        let descriptor = self.descriptor;
        let collection = descriptor.collection;

        let unique = descriptor
            .unique_constraints
            .iter()
            .map(|constraint| UniqueLink {
                fields: constraint.fields.iter().map(|field| field.to_string()).collect(),
                key_prefix: keys.unique_prefix(collection, constraint.fields),
                case_insensitive: constraint.case_insensitive,
            })
            .collect();

        let references = descriptor
            .relations
            .iter()
            .map(|relation| ReferenceLink {
                foreign_key: relation.foreign_key.to_string(),
                key_prefix: keys.entity_prefix(relation.target),
                collection: relation.target.to_string(),
            })
            .collect();

        let memberships = descriptor
            .relations
            .iter()
            .map(|relation| MembershipLink {
                foreign_key: relation.foreign_key.to_string(),
                set_prefix: keys.reverse_relation_prefix(collection, relation.alias),
            })
            .collect();

        let arrays = descriptor
            .relations
            .iter()
            .filter_map(|relation| {
                relation.parent_array.map(|field| ArrayLink {
                    foreign_key: relation.foreign_key.to_string(),
                    parent_prefix: keys.entity_prefix(relation.target),
                    path: format!("$.{field}"),
                })
            })
            .collect();

        let aggregates = descriptor
            .aggregates
            .iter()
            .filter_map(|aggregate| {
                let relation = descriptor.relation(aggregate.relation)?;
                Some(AggregateLink {
                    foreign_key: relation.foreign_key.to_string(),
                    parent_prefix: keys.entity_prefix(relation.target),
                    set_prefix: keys.reverse_relation_prefix(collection, relation.alias),
                    path: format!("$.{}", aggregate.target_field),
                    kind: match aggregate.measure {
                        AggregateMeasure::Count => AggregateKind::Count,
                        AggregateMeasure::Average { field } => AggregateKind::Average {
                            member_prefix: keys.entity_prefix(collection),
                            field: field.to_string(),
                        },
                    },
                })
            })
            .collect();

        EntityLinks {
            unique,
            references,
            memberships,
            arrays,
            aggregates,
        }
    }

    /// Foreign keys become store keys, so they must be well-formed ids.
    fn check_foreign_keys<'a>(&self, assigned: impl Iterator<Item = (&'a str, &'a Value)>) -> Result<(), RepoError> {
        let mut issues = Vec::new();
        for (field, value) in assigned {
            let is_foreign_key = self.descriptor.relations.iter().any(|relation| relation.foreign_key == field);
            if let (true, Some(id)) = (is_foreign_key, value.as_str())
                && let Err(err) = ensure_well_formed_id(field, id)
            {
                issues.extend(err.issues);
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues).into())
        }
    }

    fn prepare_document(&self, mut document: Value) -> Result<(String, String), RepoError> {
        validate_entity_json(self.descriptor, &document)?;
        let object = document
            .as_object()
            .ok_or_else(|| RepoError::other("entity did not serialize to an object"))?;
        let entity_id = object
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::single("id", "validation.required", "entity id must be present"))?
            .to_string();
        ensure_well_formed_id("id", &entity_id)?;
        self.check_foreign_keys(object.iter().map(|(field, value)| (field.as_str(), value)))?;

        add_mirrors(&mut document);
        let document_json = serde_json::to_string(&document).map_err(|err| RepoError::Other {
            message: Cow::Owned(format!("failed to serialize entity: {err}")),
        })?;
        Ok((entity_id, document_json))
    }

    pub fn insert_command(&self, document: Value) -> Result<MutationCommand, RepoError> {
        let (entity_id, document_json) = self.prepare_document(document)?;
        Ok(MutationCommand::Insert(EntityInsert {
            collection: self.name().to_string(),
            key: self.entity_key(&entity_id),
            entity_id,
            document_json,
            links: self.links(),
        }))
    }

    /// Toggles on the collection's first compound unique constraint.
    pub fn toggle_command(&self, document: Value) -> Result<MutationCommand, RepoError> {
        let constraint = self
            .descriptor
            .unique_constraints
            .iter()
            .find(|constraint| constraint.fields.len() > 1)
            .ok_or_else(|| RepoError::other(format!("{} cannot be toggled", self.name())))?;
        let values = constraint
            .fields
            .iter()
            .map(|field| document.get(*field).and_then(Value::as_str).map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ValidationError::single(constraint.fields.join(","), "validation.required", "field is required"))?;
        let pair_key = format!(
            "{}{}",
            self.keys().unique_prefix(self.name(), constraint.fields),
            join_unique_values(&values, constraint.case_insensitive)
        );

        let (entity_id, document_json) = self.prepare_document(document)?;
        Ok(MutationCommand::Toggle(RelationToggle {
            collection: self.name().to_string(),
            pair_key,
            key_prefix: self.keys().entity_prefix(self.name()),
            entity_id,
            document_json,
            links: self.links(),
        }))
    }

    pub fn patch_command(
        &self,
        entity_id: &str,
        operations: Vec<PatchOperation>,
        now: DateTime<Utc>,
    ) -> Result<MutationCommand, RepoError> {
        ensure_well_formed_id("id", entity_id)?;
        let mut issues = Vec::new();
        for operation in &operations {
            if IMMUTABLE_FIELDS.contains(&operation.field.as_str()) {
                issues.push(ValidationIssue::new(
                    &operation.field,
                    "validation.immutable",
                    "field cannot be changed",
                ));
                continue;
            }
            match self.descriptor.field(&operation.field) {
                Some(field) => issues.extend(validate_field_assignment(field, &operation.value)),
                None => issues.push(ValidationIssue::new(
                    &operation.field,
                    "validation.unknown_field",
                    "field does not exist",
                )),
            }
        }
        if !issues.is_empty() {
            return Err(ValidationError::new(issues).into());
        }
        self.check_foreign_keys(operations.iter().map(|op| (op.field.as_str(), &op.value)))?;

        let mut assignments = operations
            .iter()
            .map(|operation| FieldAssignment::new(&operation.field, &operation.value))
            .collect::<Result<Vec<_>, _>>()?;
        let updated_at = encode_value("updated_at", &now)?;
        assignments.push(FieldAssignment::new("updated_at", &updated_at)?);
        assignments.push(FieldAssignment::new(UPDATED_AT_MIRROR, &Value::from(now.timestamp_millis()))?);

        Ok(MutationCommand::Patch(EntityPatch {
            collection: self.name().to_string(),
            key: self.entity_key(entity_id),
            entity_id: entity_id.to_string(),
            assignments,
            links: self.links(),
        }))
    }

    pub fn delete_command(&self, entity_id: &str) -> Result<MutationCommand, RepoError> {
        ensure_well_formed_id("id", entity_id)?;
        let keys = self.keys();
        let incoming = registry::find_incoming_relations(self.name());

        let dependents = incoming
            .iter()
            .filter(|incoming| incoming.relation.on_target_delete == CascadePolicy::Restrict)
            .map(|incoming| DependentCheck {
                set_key: keys.reverse_relation(incoming.source.collection, incoming.relation.alias, entity_id),
                collection: incoming.source.collection.to_string(),
            })
            .collect();
        let owned_sets = incoming
            .iter()
            .map(|incoming| keys.reverse_relation(incoming.source.collection, incoming.relation.alias, entity_id))
            .collect();

        Ok(MutationCommand::Delete(EntityDelete {
            collection: self.name().to_string(),
            key: self.entity_key(entity_id),
            entity_id: entity_id.to_string(),
            links: self.links(),
            dependents,
            owned_sets,
        }))
    }

    /// Recomputes the aggregate this collection maintains in `target_field` of `parent_id`.
    pub fn refresh_command(&self, target_field: &str, parent_id: &str) -> Result<MutationCommand, RepoError> {
        ensure_well_formed_id("id", parent_id)?;
        let aggregate = self
            .links()
            .aggregates
            .into_iter()
            .find(|link| link.path == format!("$.{target_field}"))
            .ok_or_else(|| RepoError::other(format!("{} maintains no {target_field}", self.name())))?;
        let collection = self
            .descriptor
            .aggregates
            .iter()
            .find(|descriptor| descriptor.target_field == target_field)
            .and_then(|descriptor| self.descriptor.relation(descriptor.relation))
            .map(|relation| relation.target)
            .unwrap_or_default();
        Ok(MutationCommand::Refresh(AggregateRefresh {
            collection: collection.to_string(),
            parent_id: parent_id.to_string(),
            aggregate,
        }))
    }

    pub fn increment_command(&self, entity_id: &str, field: &str, by: i64) -> Result<MutationCommand, RepoError> {
        ensure_well_formed_id("id", entity_id)?;
        if self.descriptor.field(field).is_none() {
            return Err(ValidationError::single(field, "validation.unknown_field", "field does not exist").into());
        }
        Ok(MutationCommand::Increment(CounterIncrement {
            collection: self.name().to_string(),
            key: self.entity_key(entity_id),
            entity_id: entity_id.to_string(),
            path: format!("$.{field}"),
            by,
        }))
    }

    /// Strips store-only and hidden fields before a document leaves the service.
    pub fn present(&self, document: Value) -> Value {
        present_document(self.descriptor, document)
    }
}

pub fn present_document(descriptor: &EntityDescriptor, mut document: Value) -> Value {
    if let Value::Object(fields) = &mut document {
        fields.remove(CREATED_AT_MIRROR);
        fields.remove(UPDATED_AT_MIRROR);
        for hidden in descriptor.hidden_fields {
            fields.remove(*hidden);
        }
    }
    document
}

fn timestamp_millis(value: Option<&Value>) -> Option<i64> {
    let raw = value?.as_str()?;
    DateTime::parse_from_rfc3339(raw).ok().map(|parsed| parsed.timestamp_millis())
}

/// Numeric copies of the timestamps, used for sorting.
fn add_mirrors(document: &mut Value) {
    if let Value::Object(fields) = document {
        let mut mirrors = Map::new();
        if let Some(created) = timestamp_millis(fields.get("created_at")) {
            mirrors.insert(CREATED_AT_MIRROR.to_string(), Value::from(created));
        }
        if let Some(updated) = timestamp_millis(fields.get("updated_at")) {
            mirrors.insert(UPDATED_AT_MIRROR.to_string(), Value::from(updated));
        }
        fields.extend(mirrors);
    }
}

/// Typed view of a [`Collection`].
#[derive(Debug, Clone)]
pub struct Repo<T> {
    collection: Collection,
    _marker: PhantomData<T>,
}

impl<T: Entity> Repo<T> {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            collection: Collection::new(prefix, T::descriptor()),
            _marker: PhantomData,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn encode(&self, entity: &T) -> Result<Value, RepoError> {
        serde_json::to_value(entity).map_err(|err| RepoError::Other {
            message: Cow::Owned(format!("failed to serialize entity: {err}")),
        })
    }

    pub fn decode(&self, document: Value) -> Result<T, RepoError> {
        serde_json::from_value(document).map_err(|err| RepoError::Other {
            message: Cow::Owned(format!("failed to deserialize {}: {err}", self.collection.name())),
        })
    }

    pub fn insert_command(&self, entity: &T) -> Result<MutationCommand, RepoError> {
        self.collection.insert_command(self.encode(entity)?)
    }

    pub fn toggle_command(&self, entity: &T) -> Result<MutationCommand, RepoError> {
        self.collection.toggle_command(self.encode(entity)?)
    }

    pub fn present(&self, entity: &T) -> Result<Value, RepoError> {
        Ok(self.collection.present(self.encode(entity)?))
    }
}
