use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::search::{FilterField, IndexField, SortField};

/// Static description of a stored collection: field rules, unique constraints,
/// relations, and the search index used for listing.
#[derive(Debug)]
pub struct EntityDescriptor {
    pub collection: &'static str,
    pub fields: &'static [FieldDescriptor],
    pub unique_constraints: &'static [UniqueConstraintDescriptor],
    /// Outgoing belongs-to relations, each held in a foreign-key field.
    pub relations: &'static [RelationDescriptor],
    /// Id arrays on this entity that are populated with the referenced documents.
    pub has_many: &'static [HasManyDescriptor],
    /// Values on a parent recomputed whenever this entity is written or removed.
    pub aggregates: &'static [AggregateDescriptor],
    pub index: &'static [IndexField],
    pub sorts: &'static [SortField],
    pub default_sort: SortField,
    pub filters: &'static [FilterField],
    /// Boolean field hiding records from lists unless `include_inactive` is set.
    pub visibility_field: Option<&'static str>,
    /// Stored fields never included in responses.
    pub hidden_fields: &'static [&'static str],
}

impl EntityDescriptor {
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn relation(&self, alias: &str) -> Option<&'static RelationDescriptor> {
        self.relations.iter().find(|relation| relation.alias == alias)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub field_type: FieldType,
    pub optional: bool,
    pub validations: &'static [ValidationDescriptor],
}

impl FieldDescriptor {
    pub const fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            optional: false,
            validations: &[],
        }
    }

    pub const fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            optional: true,
            validations: &[],
        }
    }

    pub const fn rules(mut self, validations: &'static [ValidationDescriptor]) -> Self {
        self.validations = validations;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    #[default]
    Object,
    DateTime,
}

#[derive(Debug, Clone, Copy)]
pub enum ValidationScope {
    Field,
    EachElement,
}

#[derive(Debug, Clone, Copy)]
pub struct ValidationDescriptor {
    pub scope: ValidationScope,
    pub rule: ValidationRule,
}

impl ValidationDescriptor {
    pub const fn field(rule: ValidationRule) -> Self {
        Self {
            scope: ValidationScope::Field,
            rule,
        }
    }

    pub const fn each(rule: ValidationRule) -> Self {
        Self {
            scope: ValidationScope::EachElement,
            rule,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ValidationRule {
    Length { min: Option<usize>, max: Option<usize> },
    Range { min: Option<f64>, max: Option<f64> },
    Integer,
    Regex { pattern: &'static str },
    Enum { allowed: &'static [&'static str] },
    Email,
    Url,
}

/// Single-field or compound unique constraint, reserved in the store at write time.
#[derive(Debug, Clone, Copy)]
pub struct UniqueConstraintDescriptor {
    pub fields: &'static [&'static str],
    pub case_insensitive: bool,
}

/// What happens to a dependent when the entity it points at is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CascadePolicy {
    /// Delete the dependent as well.
    Delete,
    /// Clear the dependent's (optional) foreign key.
    Detach,
    /// Refuse to delete the target while dependents exist.
    #[default]
    Restrict,
}

/// Which fields of a referenced document a read resolves.
#[derive(Debug, Clone, Copy)]
pub enum Projection {
    None,
    All,
    Fields(&'static [&'static str]),
}

impl Projection {
    pub fn apply(&self, document: &Value) -> Option<Value> {
        match self {
            Projection::None => None,
            Projection::All => Some(document.clone()),
            Projection::Fields(fields) => {
                let source = document.as_object()?;
                let projected = fields
                    .iter()
                    .chain(std::iter::once(&"id"))
                    .filter_map(|field| source.get(*field).map(|value| ((*field).to_string(), value.clone())))
                    .collect();
                Some(Value::Object(projected))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RelationDescriptor {
    /// Name under which the target is populated, and the reverse-set alias.
    pub alias: &'static str,
    pub foreign_key: &'static str,
    pub target: &'static str,
    pub optional: bool,
    pub on_target_delete: CascadePolicy,
    /// Id array on the target that lists this entity.
    pub parent_array: Option<&'static str>,
    pub populate: Projection,
}

#[derive(Debug, Clone, Copy)]
pub struct HasManyDescriptor {
    pub field: &'static str,
    pub target: &'static str,
    pub populate: Projection,
}

#[derive(Debug, Clone, Copy)]
pub enum AggregateMeasure {
    Count,
    Average { field: &'static str },
}

/// A value on the parent of `relation` derived from this collection's members.
#[derive(Debug, Clone, Copy)]
pub struct AggregateDescriptor {
    pub relation: &'static str,
    pub target_field: &'static str,
    pub measure: AggregateMeasure,
}

/// Implemented by every stored document type.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn descriptor() -> &'static EntityDescriptor;

    fn id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projection_keeps_listed_fields_and_id() {
        let user = json!({"id": "u1", "username": "alice", "password_hash": "x", "avatar": null});
        let projected = Projection::Fields(&["username", "avatar"]).apply(&user).unwrap();
        assert_eq!(projected, json!({"id": "u1", "username": "alice", "avatar": null}));
        assert!(Projection::None.apply(&user).is_none());
        assert_eq!(Projection::All.apply(&user).unwrap(), user);
    }
}
