use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::RepoError,
    models::{IMAGE_LIST_RULES, URL_RULES, length},
    repository::{CreateInput, PatchBuilder, PatchInput, PatchOperation, nullable},
    search::{CREATED_AT_SORT, FilterField, FilterKind, IndexField, SortField, UPDATED_AT_SORT},
    types::{
        CascadePolicy, Entity, EntityDescriptor, FieldDescriptor, FieldType, HasManyDescriptor, Projection,
        RelationDescriptor, ValidationDescriptor, ValidationRule,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Restaurant {
    pub id: String,
    pub owner_id: String,
    pub category_id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub description: String,
    /// Mean rating of the restaurant's comments.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub active: bool,
    #[serde(default)]
    pub menu_items: Vec<String>,
    #[serde(default)]
    pub comments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const NAME_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(length(1, 120))];
const ADDRESS_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(length(1, 255))];
const PHONE_RULES: &[ValidationDescriptor] = &[
    ValidationDescriptor::field(length(6, 20)),
    ValidationDescriptor::field(ValidationRule::Regex {
        pattern: r"^[0-9 +\-()]+$",
    }),
];
const DESCRIPTION_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(length(0, 2000))];
const RATING_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(ValidationRule::Range {
    min: Some(0.0),
    max: Some(5.0),
})];

static RESTAURANT_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "restaurants",
    fields: &[
        FieldDescriptor::required("owner_id", FieldType::String),
        FieldDescriptor::required("category_id", FieldType::String),
        FieldDescriptor::required("name", FieldType::String).rules(NAME_RULES),
        FieldDescriptor::required("address", FieldType::String).rules(ADDRESS_RULES),
        FieldDescriptor::required("phone", FieldType::String).rules(PHONE_RULES),
        FieldDescriptor::required("description", FieldType::String).rules(DESCRIPTION_RULES),
        FieldDescriptor::required("rating", FieldType::Number).rules(RATING_RULES),
        FieldDescriptor::optional("avatar", FieldType::String).rules(URL_RULES),
        FieldDescriptor::required("images", FieldType::Array).rules(IMAGE_LIST_RULES),
        FieldDescriptor::required("active", FieldType::Boolean),
        FieldDescriptor::required("menu_items", FieldType::Array),
        FieldDescriptor::required("comments", FieldType::Array),
    ],
    unique_constraints: &[],
    relations: &[
        RelationDescriptor {
            alias: "owner",
            foreign_key: "owner_id",
            target: "users",
            optional: false,
            on_target_delete: CascadePolicy::Restrict,
            parent_array: None,
            populate: Projection::Fields(&["username", "avatar", "full_name"]),
        },
        RelationDescriptor {
            alias: "category",
            foreign_key: "category_id",
            target: "restaurant_categories",
            optional: false,
            on_target_delete: CascadePolicy::Restrict,
            parent_array: None,
            populate: Projection::Fields(&["name"]),
        },
    ],
    has_many: &[
        HasManyDescriptor {
            field: "menu_items",
            target: "menu_items",
            populate: Projection::Fields(&["name", "price", "main_image", "category_id"]),
        },
        HasManyDescriptor {
            field: "comments",
            target: "restaurant_comments",
            populate: Projection::Fields(&["author_id", "content", "rating", "like_count", "dislike_count", "created_at"]),
        },
    ],
    aggregates: &[],
    index: &[
        IndexField::text("name"),
        IndexField::tag("owner_id"),
        IndexField::tag("category_id"),
        IndexField::tag("active"),
        IndexField::numeric("rating"),
    ],
    sorts: &[
        CREATED_AT_SORT,
        UPDATED_AT_SORT,
        SortField::asc("name", "name"),
        SortField::desc("rating", "rating"),
    ],
    default_sort: CREATED_AT_SORT,
    filters: &[
        FilterField::new("name", "name", FilterKind::Contains),
        FilterField::new("owner_id", "owner_id", FilterKind::Tag),
        FilterField::new("category_id", "category_id", FilterKind::Tag),
        FilterField::new("min_rating", "rating", FilterKind::Min),
    ],
    visibility_field: Some("active"),
    hidden_fields: &[],
};

impl Entity for Restaurant {
    fn descriptor() -> &'static EntityDescriptor {
        &RESTAURANT_DESCRIPTOR
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantInput {
    pub owner_id: String,
    pub category_id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateInput for RestaurantInput {
    type Entity = Restaurant;

    fn into_entity(self, id: String, now: DateTime<Utc>) -> Result<Restaurant, RepoError> {
        Ok(Restaurant {
            id,
            owner_id: self.owner_id,
            category_id: self.category_id,
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            phone: self.phone.trim().to_string(),
            description: self.description,
            rating: 0.0,
            avatar: self.avatar,
            images: self.images,
            active: true,
            menu_items: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestaurantPatch {
    pub owner_id: Option<String>,
    pub category_id: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar: Option<Option<String>>,
    pub images: Option<Vec<String>>,
    pub active: Option<bool>,
}

impl PatchInput for RestaurantPatch {
    type Entity = Restaurant;

    fn into_operations(self) -> Result<Vec<PatchOperation>, RepoError> {
        Ok(PatchBuilder::new()
            .set("owner_id", self.owner_id)?
            .set("category_id", self.category_id)?
            .set("name", self.name.map(|value| value.trim().to_string()))?
            .set("address", self.address.map(|value| value.trim().to_string()))?
            .set("phone", self.phone.map(|value| value.trim().to_string()))?
            .set("description", self.description)?
            .set_nullable("avatar", self.avatar)?
            .set("images", self.images)?
            .set("active", self.active)?
            .build())
    }
}
