use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{RepoError, ValidationError};

/// A single atomic store mutation. Each variant maps to one Lua script and to
/// one critical section in the memory store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationCommand {
    Insert(EntityInsert),
    Patch(EntityPatch),
    Delete(EntityDelete),
    Toggle(RelationToggle),
    Refresh(AggregateRefresh),
    Increment(CounterIncrement),
}

/// Everything a document is linked to. Link keys are derived from the document
/// itself (`prefix + document[foreign_key]`) when the command runs, so the same
/// description serves insert, patch and delete.
#[derive(Debug, Clone, Serialize, Default)]
pub struct EntityLinks {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unique: Vec<UniqueLink>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceLink>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub memberships: Vec<MembershipLink>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arrays: Vec<ArrayLink>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aggregates: Vec<AggregateLink>,
}

/// Unique reservation: `key_prefix + join(values)` holds the owning id.
#[derive(Debug, Clone, Serialize)]
pub struct UniqueLink {
    pub fields: Vec<String>,
    pub key_prefix: String,
    pub case_insensitive: bool,
}

/// A foreign key that must point at an existing document.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceLink {
    pub foreign_key: String,
    pub key_prefix: String,
    pub collection: String,
}

/// Reverse-relation set on the referenced parent.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipLink {
    pub foreign_key: String,
    pub set_prefix: String,
}

/// Id array on the referenced parent document.
#[derive(Debug, Clone, Serialize)]
pub struct ArrayLink {
    pub foreign_key: String,
    pub parent_prefix: String,
    pub path: String,
}

/// Derived value on the referenced parent, computed from its reverse-relation set.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateLink {
    pub foreign_key: String,
    pub parent_prefix: String,
    pub set_prefix: String,
    pub path: String,
    #[serde(flatten)]
    pub kind: AggregateKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateKind {
    Count,
    /// Mean of `field` over the member documents, rounded to two decimals, 0 when empty.
    Average { member_prefix: String, field: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityInsert {
    pub collection: String,
    pub key: String,
    pub entity_id: String,
    pub document_json: String,
    pub links: EntityLinks,
}

/// Top-level field assignment. The value travels pre-encoded so the script never
/// re-encodes it.
#[derive(Debug, Clone, Serialize)]
pub struct FieldAssignment {
    pub field: String,
    pub value_json: String,
}

impl FieldAssignment {
    pub fn new(field: impl Into<String>, value: &Value) -> Result<Self, ValidationError> {
        let field = field.into();
        let value_json = serde_json::to_string(value).map_err(|err| {
            ValidationError::single(field.clone(), "serialization_error", format!("failed to encode value: {err}"))
        })?;
        Ok(Self { field, value_json })
    }

    pub fn value(&self) -> Value {
        serde_json::from_str(&self.value_json).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityPatch {
    pub collection: String,
    pub key: String,
    pub entity_id: String,
    pub assignments: Vec<FieldAssignment>,
    pub links: EntityLinks,
}

/// A reverse-relation set that must be empty before the entity can go.
#[derive(Debug, Clone, Serialize)]
pub struct DependentCheck {
    pub set_key: String,
    pub collection: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityDelete {
    pub collection: String,
    pub key: String,
    pub entity_id: String,
    pub links: EntityLinks,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependents: Vec<DependentCheck>,
    /// Reverse-relation sets keyed by this entity, dropped with it.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owned_sets: Vec<String>,
}

/// Inserts the relation document unless one already holds `pair_key`, in which
/// case that one is removed.
#[derive(Debug, Clone, Serialize)]
pub struct RelationToggle {
    pub collection: String,
    pub pair_key: String,
    pub key_prefix: String,
    pub entity_id: String,
    pub document_json: String,
    pub links: EntityLinks,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateRefresh {
    pub collection: String,
    pub parent_id: String,
    pub aggregate: AggregateLink,
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterIncrement {
    pub collection: String,
    pub key: String,
    pub entity_id: String,
    pub path: String,
    pub by: i64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct MutationPlan {
    pub commands: Vec<MutationCommand>,
}

impl MutationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(command: MutationCommand) -> Self {
        Self {
            commands: vec![command],
        }
    }

    pub fn push(&mut self, command: MutationCommand) {
        self.commands.push(command);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleAction {
    Added,
    Removed,
}

/// A parent value rewritten by a command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefreshedAggregate {
    pub key: String,
    pub path: String,
    pub value: f64,
}

/// What a command reports back.
#[derive(Debug, Clone, Default)]
pub struct MutationOutcome {
    pub action: Option<ToggleAction>,
    /// Stored document after a patch, or the removed one after a delete/toggle-off.
    pub document: Option<Value>,
    pub refreshed: Vec<RefreshedAggregate>,
    /// Counter value after an increment.
    pub value: Option<f64>,
}

impl MutationOutcome {
    pub fn refreshed_value(&self, key: &str, path: &str) -> Option<f64> {
        self.refreshed
            .iter()
            .find(|entry| entry.key == key && entry.path == path)
            .map(|entry| entry.value)
    }

    pub fn into_document(self) -> Result<Value, RepoError> {
        self.document
            .ok_or_else(|| RepoError::other("store did not return the affected document"))
    }
}
