use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::RepoError,
    models::{IMAGE_LIST_RULES, length},
    repository::{CreateInput, PatchBuilder, PatchInput, PatchOperation, nullable},
    search::{CREATED_AT_SORT, FilterField, FilterKind, IndexField, SortField, UPDATED_AT_SORT},
    types::{
        CascadePolicy, Entity, EntityDescriptor, FieldDescriptor, FieldType, HasManyDescriptor, Projection,
        RelationDescriptor, ValidationDescriptor, ValidationRule,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    #[serde(default)]
    pub restaurant_id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub view_count: u64,
    /// Number of likes; rewritten by every like insert or delete.
    #[serde(default)]
    pub like_count: u64,
    pub active: bool,
    #[serde(default)]
    pub comments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const TITLE_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(length(1, 200))];
const CONTENT_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(length(1, 10_000))];
const COUNTER_RULES: &[ValidationDescriptor] = &[
    ValidationDescriptor::field(ValidationRule::Integer),
    ValidationDescriptor::field(ValidationRule::Range {
        min: Some(0.0),
        max: None,
    }),
];

static POST_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "posts",
    fields: &[
        FieldDescriptor::required("author_id", FieldType::String),
        FieldDescriptor::optional("restaurant_id", FieldType::String),
        FieldDescriptor::required("title", FieldType::String).rules(TITLE_RULES),
        FieldDescriptor::required("content", FieldType::String).rules(CONTENT_RULES),
        FieldDescriptor::required("images", FieldType::Array).rules(IMAGE_LIST_RULES),
        FieldDescriptor::required("view_count", FieldType::Number).rules(COUNTER_RULES),
        FieldDescriptor::required("like_count", FieldType::Number).rules(COUNTER_RULES),
        FieldDescriptor::required("active", FieldType::Boolean),
        FieldDescriptor::required("comments", FieldType::Array),
    ],
    unique_constraints: &[],
    relations: &[
        RelationDescriptor {
            alias: "author",
            foreign_key: "author_id",
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
            optional: true,
            on_target_delete: CascadePolicy::Detach,
            parent_array: None,
            populate: Projection::Fields(&["name", "address", "avatar"]),
        },
    ],
    has_many: &[HasManyDescriptor {
        field: "comments",
        target: "post_comments",
        populate: Projection::Fields(&["author_id", "content", "like_count", "dislike_count", "created_at"]),
    }],
    aggregates: &[],
    index: &[
        IndexField::text("title"),
        IndexField::tag("author_id"),
        IndexField::tag("restaurant_id"),
        IndexField::tag("active"),
        IndexField::numeric("like_count"),
        IndexField::numeric("view_count"),
    ],
    sorts: &[
        CREATED_AT_SORT,
        UPDATED_AT_SORT,
        SortField::asc("title", "title"),
        SortField::desc("like_count", "like_count"),
        SortField::desc("view_count", "view_count"),
    ],
    default_sort: CREATED_AT_SORT,
    filters: &[
        FilterField::new("title", "title", FilterKind::Contains),
        FilterField::new("author_id", "author_id", FilterKind::Tag),
        FilterField::new("restaurant_id", "restaurant_id", FilterKind::Tag),
    ],
    visibility_field: Some("active"),
    hidden_fields: &[],
};

impl Entity for Post {
    fn descriptor() -> &'static EntityDescriptor {
        &POST_DESCRIPTOR
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostInput {
    pub author_id: String,
    #[serde(default)]
    pub restaurant_id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateInput for PostInput {
    type Entity = Post;

    fn into_entity(self, id: String, now: DateTime<Utc>) -> Result<Post, RepoError> {
        Ok(Post {
            id,
            author_id: self.author_id,
            restaurant_id: self.restaurant_id,
            title: self.title.trim().to_string(),
            content: self.content,
            images: self.images,
            view_count: 0,
            like_count: 0,
            active: true,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPatch {
    #[serde(default, deserialize_with = "nullable")]
    pub restaurant_id: Option<Option<String>>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub images: Option<Vec<String>>,
    pub active: Option<bool>,
}

impl PatchInput for PostPatch {
    type Entity = Post;

    fn into_operations(self) -> Result<Vec<PatchOperation>, RepoError> {
        Ok(PatchBuilder::new()
            .set_nullable("restaurant_id", self.restaurant_id)?
            .set("title", self.title.map(|value| value.trim().to_string()))?
            .set("content", self.content)?
            .set("images", self.images)?
            .set("active", self.active)?
            .build())
    }
}
