use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::RepoError,
    models::length,
    repository::{CreateInput, PatchBuilder, PatchInput, PatchOperation, nullable},
    search::{CREATED_AT_SORT, FilterField, FilterKind, IndexField, SortField, UPDATED_AT_SORT},
    types::{Entity, EntityDescriptor, FieldDescriptor, FieldType, UniqueConstraintDescriptor, ValidationDescriptor},
};

const NAME_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(length(1, 100))];
const DESCRIPTION_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(length(0, 500))];

const CATEGORY_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::required("name", FieldType::String).rules(NAME_RULES),
    FieldDescriptor::optional("description", FieldType::String).rules(DESCRIPTION_RULES),
];
const CATEGORY_UNIQUE: &[UniqueConstraintDescriptor] = &[UniqueConstraintDescriptor {
    fields: &["name"],
    case_insensitive: true,
}];
const CATEGORY_INDEX: &[IndexField] = &[IndexField::text("name")];
const CATEGORY_SORTS: &[SortField] = &[CREATED_AT_SORT, UPDATED_AT_SORT, SortField::asc("name", "name")];
const CATEGORY_FILTERS: &[FilterField] = &[FilterField::new("name", "name", FilterKind::Contains)];

const fn category_descriptor(collection: &'static str) -> EntityDescriptor {
    EntityDescriptor {
        collection,
        fields: CATEGORY_FIELDS,
        unique_constraints: CATEGORY_UNIQUE,
        relations: &[],
        has_many: &[],
        aggregates: &[],
        index: CATEGORY_INDEX,
        sorts: CATEGORY_SORTS,
        default_sort: CREATED_AT_SORT,
        filters: CATEGORY_FILTERS,
        visibility_field: None,
        hidden_fields: &[],
    }
}

static RESTAURANT_CATEGORY_DESCRIPTOR: EntityDescriptor = category_descriptor("restaurant_categories");
static MENU_CATEGORY_DESCRIPTOR: EntityDescriptor = category_descriptor("menu_categories");

/// Both category taxonomies share one shape; only the collection differs.
macro_rules! category_entity {
    ($entity:ident, $input:ident, $patch:ident, $descriptor:ident) => {
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
        pub struct $entity {
            pub id: String,
            pub name: String,
            #[serde(default)]
            pub description: Option<String>,
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
            pub name: String,
            #[serde(default)]
            pub description: Option<String>,
        }

        impl CreateInput for $input {
            type Entity = $entity;

            fn into_entity(self, id: String, now: DateTime<Utc>) -> Result<$entity, RepoError> {
                Ok($entity {
                    id,
                    name: self.name.trim().to_string(),
                    description: self.description,
                    created_at: now,
                    updated_at: now,
                })
            }
        }

        #[derive(Debug, Clone, Default, Deserialize)]
        pub struct $patch {
            pub name: Option<String>,
            #[serde(default, deserialize_with = "nullable")]
            pub description: Option<Option<String>>,
        }

        impl PatchInput for $patch {
            type Entity = $entity;

            fn into_operations(self) -> Result<Vec<PatchOperation>, RepoError> {
                Ok(PatchBuilder::new()
                    .set("name", self.name.map(|name| name.trim().to_string()))?
                    .set_nullable("description", self.description)?
                    .build())
            }
        }
    };
}

category_entity!(RestaurantCategory, CategoryInput, CategoryPatch, RESTAURANT_CATEGORY_DESCRIPTOR);
category_entity!(MenuCategory, MenuCategoryInput, MenuCategoryPatch, MENU_CATEGORY_DESCRIPTOR);
