use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::RepoError,
    repository::{CreateInput, PatchBuilder, PatchInput, PatchOperation, nullable},
    search::{CREATED_AT_SORT, FilterField, FilterKind, IndexField, UPDATED_AT_SORT},
    types::{
        CascadePolicy, Entity, EntityDescriptor, FieldDescriptor, FieldType, Projection, RelationDescriptor,
        UniqueConstraintDescriptor, ValidationDescriptor,
    },
};

use super::length;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub restaurant_id: String,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const NOTE_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(length(0, 500))];

static FAVORITE_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "favorites",
    fields: &[
        FieldDescriptor::required("user_id", FieldType::String),
        FieldDescriptor::required("restaurant_id", FieldType::String),
        FieldDescriptor::optional("note", FieldType::String).rules(NOTE_RULES),
    ],
    unique_constraints: &[UniqueConstraintDescriptor {
        fields: &["user_id", "restaurant_id"],
        case_insensitive: false,
    }],
    relations: &[
        RelationDescriptor {
            alias: "user",
            foreign_key: "user_id",
            target: "users",
            optional: false,
            on_target_delete: CascadePolicy::Delete,
            parent_array: None,
            populate: Projection::Fields(&["username", "avatar"]),
        },
        RelationDescriptor {
            alias: "restaurant",
            foreign_key: "restaurant_id",
            target: "restaurants",
            optional: false,
            on_target_delete: CascadePolicy::Delete,
            parent_array: None,
            populate: Projection::Fields(&["name", "address", "avatar", "rating"]),
        },
    ],
    has_many: &[],
    aggregates: &[],
    index: &[IndexField::tag("user_id"), IndexField::tag("restaurant_id")],
    sorts: &[CREATED_AT_SORT, UPDATED_AT_SORT],
    default_sort: CREATED_AT_SORT,
    filters: &[
        FilterField::new("user_id", "user_id", FilterKind::Tag),
        FilterField::new("restaurant_id", "restaurant_id", FilterKind::Tag),
    ],
    visibility_field: None,
    hidden_fields: &[],
};

impl Entity for Favorite {
    fn descriptor() -> &'static EntityDescriptor {
        &FAVORITE_DESCRIPTOR
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteInput {
    pub user_id: String,
    pub restaurant_id: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl CreateInput for FavoriteInput {
    type Entity = Favorite;

    fn into_entity(self, id: String, now: DateTime<Utc>) -> Result<Favorite, RepoError> {
        Ok(Favorite {
            id,
            user_id: self.user_id.trim().to_string(),
            restaurant_id: self.restaurant_id.trim().to_string(),
            note: self.note,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Only the note is editable; the pair itself is fixed once created.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FavoritePatch {
    #[serde(default, deserialize_with = "nullable")]
    pub note: Option<Option<String>>,
}

impl PatchInput for FavoritePatch {
    type Entity = Favorite;

    fn into_operations(self) -> Result<Vec<PatchOperation>, RepoError> {
        Ok(PatchBuilder::new().set_nullable("note", self.note)?.build())
    }
}
