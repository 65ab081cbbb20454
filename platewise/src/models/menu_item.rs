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
pub struct MenuItem {
    pub id: String,
    pub restaurant_id: String,
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub main_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub comments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const NAME_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(length(1, 120))];
const DESCRIPTION_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(length(0, 1000))];
const PRICE_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(ValidationRule::Range {
    min: Some(0.0),
    max: None,
})];

static MENU_ITEM_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "menu_items",
    fields: &[
        FieldDescriptor::required("restaurant_id", FieldType::String),
        FieldDescriptor::required("category_id", FieldType::String),
        FieldDescriptor::required("name", FieldType::String).rules(NAME_RULES),
        FieldDescriptor::required("description", FieldType::String).rules(DESCRIPTION_RULES),
        FieldDescriptor::required("price", FieldType::Number).rules(PRICE_RULES),
        FieldDescriptor::optional("main_image", FieldType::String).rules(URL_RULES),
        FieldDescriptor::required("images", FieldType::Array).rules(IMAGE_LIST_RULES),
        FieldDescriptor::required("comments", FieldType::Array),
    ],
    unique_constraints: &[],
    relations: &[
        RelationDescriptor {
            alias: "restaurant",
            foreign_key: "restaurant_id",
            target: "restaurants",
            optional: false,
            on_target_delete: CascadePolicy::Delete,
            parent_array: Some("menu_items"),
            populate: Projection::Fields(&["name", "address", "avatar"]),
        },
        RelationDescriptor {
            alias: "category",
            foreign_key: "category_id",
            target: "menu_categories",
            optional: false,
            on_target_delete: CascadePolicy::Restrict,
            parent_array: None,
            populate: Projection::Fields(&["name"]),
        },
    ],
    has_many: &[HasManyDescriptor {
        field: "comments",
        target: "menu_comments",
        populate: Projection::Fields(&["author_id", "content", "like_count", "dislike_count", "created_at"]),
    }],
    aggregates: &[],
    index: &[
        IndexField::text("name"),
        IndexField::tag("restaurant_id"),
        IndexField::tag("category_id"),
        IndexField::numeric("price"),
    ],
    sorts: &[
        CREATED_AT_SORT,
        UPDATED_AT_SORT,
        SortField::asc("name", "name"),
        SortField::asc("price", "price"),
    ],
    default_sort: CREATED_AT_SORT,
    filters: &[
        FilterField::new("name", "name", FilterKind::Contains),
        FilterField::new("restaurant_id", "restaurant_id", FilterKind::Tag),
        FilterField::new("category_id", "category_id", FilterKind::Tag),
    ],
    visibility_field: None,
    hidden_fields: &[],
};

impl Entity for MenuItem {
    fn descriptor() -> &'static EntityDescriptor {
        &MENU_ITEM_DESCRIPTOR
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuItemInput {
    pub restaurant_id: String,
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub main_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateInput for MenuItemInput {
    type Entity = MenuItem;

    fn into_entity(self, id: String, now: DateTime<Utc>) -> Result<MenuItem, RepoError> {
        Ok(MenuItem {
            id,
            restaurant_id: self.restaurant_id,
            category_id: self.category_id,
            name: self.name.trim().to_string(),
            description: self.description,
            price: self.price,
            main_image: self.main_image,
            images: self.images,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemPatch {
    pub restaurant_id: Option<String>,
    pub category_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub main_image: Option<Option<String>>,
    pub images: Option<Vec<String>>,
}

impl PatchInput for MenuItemPatch {
    type Entity = MenuItem;

    fn into_operations(self) -> Result<Vec<PatchOperation>, RepoError> {
        Ok(PatchBuilder::new()
            .set("restaurant_id", self.restaurant_id)?
            .set("category_id", self.category_id)?
            .set("name", self.name.map(|value| value.trim().to_string()))?
            .set("description", self.description)?
            .set("price", self.price)?
            .set_nullable("main_image", self.main_image)?
            .set("images", self.images)?
            .build())
    }
}
