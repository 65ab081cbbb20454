//! Comments on posts, restaurants and menu items.
//!
//! The three variants share a shape and differ in the parent they hang off.
//! Restaurant comments also carry a rating that feeds `Restaurant.rating`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::RepoError,
    models::length,
    repository::{CreateInput, PatchBuilder, PatchInput, PatchOperation},
    search::{CREATED_AT_SORT, FilterField, FilterKind, IndexField, SortField, UPDATED_AT_SORT},
    types::{
        AggregateDescriptor, AggregateMeasure, CascadePolicy, Entity, EntityDescriptor, FieldDescriptor, FieldType,
        Projection, RelationDescriptor, ValidationDescriptor, ValidationRule,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    /// Counter field bumped by this reaction.
    pub fn counter_field(self) -> &'static str {
        match self {
            Reaction::Like => "like_count",
            Reaction::Dislike => "dislike_count",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReactionInput {
    pub reaction: Reaction,
}

const CONTENT_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(length(1, 2000))];
const COUNTER_RULES: &[ValidationDescriptor] = &[
    ValidationDescriptor::field(ValidationRule::Integer),
    ValidationDescriptor::field(ValidationRule::Range {
        min: Some(0.0),
        max: None,
    }),
];
const RATING_RULES: &[ValidationDescriptor] = &[
    ValidationDescriptor::field(ValidationRule::Integer),
    ValidationDescriptor::field(ValidationRule::Range {
        min: Some(1.0),
        max: Some(5.0),
    }),
];

const AUTHOR_RELATION: RelationDescriptor = RelationDescriptor {
    alias: "author",
    foreign_key: "author_id",
    target: "users",
    optional: false,
    on_target_delete: CascadePolicy::Delete,
    parent_array: None,
    populate: Projection::Fields(&["username", "avatar"]),
};

const AUTHOR_FIELD: FieldDescriptor = FieldDescriptor::required("author_id", FieldType::String);
const CONTENT_FIELD: FieldDescriptor = FieldDescriptor::required("content", FieldType::String).rules(CONTENT_RULES);
const LIKE_COUNT_FIELD: FieldDescriptor =
    FieldDescriptor::required("like_count", FieldType::Number).rules(COUNTER_RULES);
const DISLIKE_COUNT_FIELD: FieldDescriptor =
    FieldDescriptor::required("dislike_count", FieldType::Number).rules(COUNTER_RULES);

const COMMENT_SORTS: &[SortField] = &[
    CREATED_AT_SORT,
    UPDATED_AT_SORT,
    SortField::desc("like_count", "like_count"),
];

static POST_COMMENT_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "post_comments",
    fields: &[
        AUTHOR_FIELD,
        FieldDescriptor::required("post_id", FieldType::String),
        CONTENT_FIELD,
        LIKE_COUNT_FIELD,
        DISLIKE_COUNT_FIELD,
    ],
    unique_constraints: &[],
    relations: &[
        AUTHOR_RELATION,
        RelationDescriptor {
            alias: "post",
            foreign_key: "post_id",
            target: "posts",
            optional: false,
            on_target_delete: CascadePolicy::Delete,
            parent_array: Some("comments"),
            populate: Projection::Fields(&["title"]),
        },
    ],
    has_many: &[],
    aggregates: &[],
    index: &[
        IndexField::tag("author_id"),
        IndexField::tag("post_id"),
        IndexField::numeric("like_count"),
    ],
    sorts: COMMENT_SORTS,
    default_sort: CREATED_AT_SORT,
    filters: &[
        FilterField::new("author_id", "author_id", FilterKind::Tag),
        FilterField::new("post_id", "post_id", FilterKind::Tag),
    ],
    visibility_field: None,
    hidden_fields: &[],
};

static RESTAURANT_COMMENT_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "restaurant_comments",
    fields: &[
        AUTHOR_FIELD,
        FieldDescriptor::required("restaurant_id", FieldType::String),
        CONTENT_FIELD,
        FieldDescriptor::required("rating", FieldType::Number).rules(RATING_RULES),
        LIKE_COUNT_FIELD,
        DISLIKE_COUNT_FIELD,
    ],
    unique_constraints: &[],
    relations: &[
        AUTHOR_RELATION,
        RelationDescriptor {
            alias: "restaurant",
            foreign_key: "restaurant_id",
            target: "restaurants",
            optional: false,
            on_target_delete: CascadePolicy::Delete,
            parent_array: Some("comments"),
            populate: Projection::Fields(&["name", "avatar"]),
        },
    ],
    has_many: &[],
    aggregates: &[AggregateDescriptor {
        relation: "restaurant",
        target_field: "rating",
        measure: AggregateMeasure::Average { field: "rating" },
    }],
    index: &[
        IndexField::tag("author_id"),
        IndexField::tag("restaurant_id"),
        IndexField::numeric("like_count"),
        IndexField::numeric("rating"),
    ],
    sorts: &[
        CREATED_AT_SORT,
        UPDATED_AT_SORT,
        SortField::desc("like_count", "like_count"),
        SortField::desc("rating", "rating"),
    ],
    default_sort: CREATED_AT_SORT,
    filters: &[
        FilterField::new("author_id", "author_id", FilterKind::Tag),
        FilterField::new("restaurant_id", "restaurant_id", FilterKind::Tag),
        FilterField::new("min_rating", "rating", FilterKind::Min),
    ],
    visibility_field: None,
    hidden_fields: &[],
};

static MENU_COMMENT_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "menu_comments",
    fields: &[
        AUTHOR_FIELD,
        FieldDescriptor::required("menu_item_id", FieldType::String),
        CONTENT_FIELD,
        LIKE_COUNT_FIELD,
        DISLIKE_COUNT_FIELD,
    ],
    unique_constraints: &[],
    relations: &[
        AUTHOR_RELATION,
        RelationDescriptor {
            alias: "menu_item",
            foreign_key: "menu_item_id",
            target: "menu_items",
            optional: false,
            on_target_delete: CascadePolicy::Delete,
            parent_array: Some("comments"),
            populate: Projection::Fields(&["name", "price"]),
        },
    ],
    has_many: &[],
    aggregates: &[],
    index: &[
        IndexField::tag("author_id"),
        IndexField::tag("menu_item_id"),
        IndexField::numeric("like_count"),
    ],
    sorts: COMMENT_SORTS,
    default_sort: CREATED_AT_SORT,
    filters: &[
        FilterField::new("author_id", "author_id", FilterKind::Tag),
        FilterField::new("menu_item_id", "menu_item_id", FilterKind::Tag),
    ],
    visibility_field: None,
    hidden_fields: &[],
};

/// Comment types without a rating; only the parent key differs.
macro_rules! unrated_comment {
    ($entity:ident, $input:ident, $patch:ident, $parent:ident, $descriptor:ident) => {
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
        pub struct $entity {
            pub id: String,
            pub author_id: String,
            pub $parent: String,
            pub content: String,
            #[serde(default)]
            pub like_count: u64,
            #[serde(default)]
            pub dislike_count: u64,
            pub created_at: DateTime<Utc>,
            pub updated_at: DateTime<Utc>,
        }

        impl Entity for $entity {
            fn descriptor() -> &'static EntityDescriptor {
                &$descriptor
            }

            fn id(&self) -> &str {
                &self.id
            }
        }

        #[derive(Debug, Clone, Deserialize)]
        pub struct $input {
            pub author_id: String,
            pub $parent: String,
            pub content: String,
        }

        impl CreateInput for $input {
            type Entity = $entity;

            fn into_entity(self, id: String, now: DateTime<Utc>) -> Result<$entity, RepoError> {
                Ok($entity {
                    id,
                    author_id: self.author_id,
                    $parent: self.$parent,
                    content: self.content.trim().to_string(),
                    like_count: 0,
                    dislike_count: 0,
                    created_at: now,
                    updated_at: now,
                })
            }
        }

        #[derive(Debug, Clone, Default, Deserialize)]
        pub struct $patch {
            pub content: Option<String>,
        }

        impl PatchInput for $patch {
            type Entity = $entity;

            fn into_operations(self) -> Result<Vec<PatchOperation>, RepoError> {
                Ok(PatchBuilder::new()
                    .set("content", self.content.map(|value| value.trim().to_string()))?
                    .build())
            }
        }
    };
}

unrated_comment!(PostComment, PostCommentInput, PostCommentPatch, post_id, POST_COMMENT_DESCRIPTOR);
unrated_comment!(MenuComment, MenuCommentInput, MenuCommentPatch, menu_item_id, MENU_COMMENT_DESCRIPTOR);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestaurantComment {
    pub id: String,
    pub author_id: String,
    pub restaurant_id: String,
    pub content: String,
    pub rating: u8,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub dislike_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for RestaurantComment {
    fn descriptor() -> &'static EntityDescriptor {
        &RESTAURANT_COMMENT_DESCRIPTOR
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantCommentInput {
    pub author_id: String,
    pub restaurant_id: String,
    pub content: String,
    pub rating: u8,
}

impl CreateInput for RestaurantCommentInput {
    type Entity = RestaurantComment;

    fn into_entity(self, id: String, now: DateTime<Utc>) -> Result<RestaurantComment, RepoError> {
        Ok(RestaurantComment {
            id,
            author_id: self.author_id,
            restaurant_id: self.restaurant_id,
            content: self.content.trim().to_string(),
            rating: self.rating,
            like_count: 0,
            dislike_count: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestaurantCommentPatch {
    pub content: Option<String>,
    pub rating: Option<u8>,
}

impl PatchInput for RestaurantCommentPatch {
    type Entity = RestaurantComment;

    fn into_operations(self) -> Result<Vec<PatchOperation>, RepoError> {
        Ok(PatchBuilder::new()
            .set("content", self.content.map(|value| value.trim().to_string()))?
            .set("rating", self.rating)?
            .build())
    }
}
