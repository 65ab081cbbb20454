use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::RepoError,
    repository::CreateInput,
    search::{CREATED_AT_SORT, FilterField, FilterKind, IndexField, UPDATED_AT_SORT},
    types::{
        AggregateDescriptor, AggregateMeasure, CascadePolicy, Entity, EntityDescriptor, FieldDescriptor, FieldType,
        Projection, RelationDescriptor, UniqueConstraintDescriptor,
    },
};

/// One user's like on one post. At most one exists per pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Like {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

static LIKE_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "post_likes",
    fields: &[
        FieldDescriptor::required("post_id", FieldType::String),
        FieldDescriptor::required("user_id", FieldType::String),
    ],
    unique_constraints: &[UniqueConstraintDescriptor {
        fields: &["post_id", "user_id"],
        case_insensitive: false,
    }],
    relations: &[
        RelationDescriptor {
            alias: "post",
            foreign_key: "post_id",
            target: "posts",
            optional: false,
            on_target_delete: CascadePolicy::Delete,
            parent_array: None,
            populate: Projection::Fields(&["title", "content"]),
        },
        RelationDescriptor {
            alias: "user",
            foreign_key: "user_id",
            target: "users",
            optional: false,
            on_target_delete: CascadePolicy::Delete,
            parent_array: None,
            populate: Projection::Fields(&["username", "avatar"]),
        },
    ],
    has_many: &[],
    aggregates: &[AggregateDescriptor {
        relation: "post",
        target_field: "like_count",
        measure: AggregateMeasure::Count,
    }],
    index: &[IndexField::tag("post_id"), IndexField::tag("user_id")],
    sorts: &[CREATED_AT_SORT, UPDATED_AT_SORT],
    default_sort: CREATED_AT_SORT,
    filters: &[
        FilterField::new("post_id", "post_id", FilterKind::Tag),
        FilterField::new("user_id", "user_id", FilterKind::Tag),
    ],
    visibility_field: None,
    hidden_fields: &[],
};

impl Entity for Like {
    fn descriptor() -> &'static EntityDescriptor {
        &LIKE_DESCRIPTOR
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LikeInput {
    pub post_id: String,
    pub user_id: String,
}

impl CreateInput for LikeInput {
    type Entity = Like;

    fn into_entity(self, id: String, now: DateTime<Utc>) -> Result<Like, RepoError> {
        Ok(Like {
            id,
            post_id: self.post_id.trim().to_string(),
            user_id: self.user_id.trim().to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}
