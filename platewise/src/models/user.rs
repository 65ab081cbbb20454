use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::RepoError,
    models::{URL_RULES, length},
    repository::{CreateInput, PatchBuilder, PatchInput, PatchOperation, nullable},
    search::{CREATED_AT_SORT, FilterField, FilterKind, IndexField, SortField, UPDATED_AT_SORT},
    types::{
        Entity, EntityDescriptor, FieldDescriptor, FieldType, UniqueConstraintDescriptor, ValidationDescriptor,
        ValidationRule,
    },
    workflows::accounts::{hash_password, validate_password},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Customer,
    RestaurantOwner,
    Admin,
}

impl Role {
    pub fn can_own_restaurants(self) -> bool {
        matches!(self, Role::RestaurantOwner | Role::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const USERNAME_RULES: &[ValidationDescriptor] = &[
    ValidationDescriptor::field(length(3, 30)),
    ValidationDescriptor::field(ValidationRule::Regex {
        pattern: "^[A-Za-z0-9_.]+$",
    }),
];
const EMAIL_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(ValidationRule::Email)];
const ROLE_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(ValidationRule::Enum {
    allowed: &["customer", "restaurant_owner", "admin"],
})];
const FULL_NAME_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(length(1, 100))];

static USER_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "users",
    fields: &[
        FieldDescriptor::required("username", FieldType::String).rules(USERNAME_RULES),
        FieldDescriptor::required("email", FieldType::String).rules(EMAIL_RULES),
        FieldDescriptor::required("password_hash", FieldType::String),
        FieldDescriptor::required("role", FieldType::String).rules(ROLE_RULES),
        FieldDescriptor::required("active", FieldType::Boolean),
        FieldDescriptor::optional("avatar", FieldType::String).rules(URL_RULES),
        FieldDescriptor::optional("full_name", FieldType::String).rules(FULL_NAME_RULES),
    ],
    unique_constraints: &[
        UniqueConstraintDescriptor {
            fields: &["username"],
            case_insensitive: true,
        },
        UniqueConstraintDescriptor {
            fields: &["email"],
            case_insensitive: true,
        },
    ],
    relations: &[],
    has_many: &[],
    aggregates: &[],
    index: &[IndexField::text("username"), IndexField::tag("role"), IndexField::tag("active")],
    sorts: &[CREATED_AT_SORT, UPDATED_AT_SORT, SortField::asc("username", "username")],
    default_sort: CREATED_AT_SORT,
    filters: &[
        FilterField::new("username", "username", FilterKind::Contains),
        FilterField::new("role", "role", FilterKind::Tag),
        FilterField::new("active", "active", FilterKind::Bool),
    ],
    visibility_field: None,
    hidden_fields: &["password_hash"],
};

impl Entity for User {
    fn descriptor() -> &'static EntityDescriptor {
        &USER_DESCRIPTOR
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// What the API shows of a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub avatar: Option<String>,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            active: user.active,
            avatar: user.avatar,
            full_name: user.full_name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl CreateInput for UserInput {
    type Entity = User;

    fn into_entity(self, id: String, now: DateTime<Utc>) -> Result<User, RepoError> {
        validate_password(&self.password)?;
        Ok(User {
            id,
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password_hash: hash_password(&self.password)?,
            role: self.role,
            active: true,
            avatar: self.avatar,
            full_name: self.full_name,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub full_name: Option<Option<String>>,
}

impl PatchInput for UserPatch {
    type Entity = User;

    fn into_operations(self) -> Result<Vec<PatchOperation>, RepoError> {
        // only a supplied password is rehashed
        let password_hash = match self.password {
            Some(password) => {
                validate_password(&password)?;
                Some(hash_password(&password)?)
            }
            None => None,
        };
        Ok(PatchBuilder::new()
            .set("username", self.username.map(|value| value.trim().to_string()))?
            .set("email", self.email.map(|value| value.trim().to_string()))?
            .set("password_hash", password_hash)?
            .set("role", self.role)?
            .set("active", self.active)?
            .set_nullable("avatar", self.avatar)?
            .set_nullable("full_name", self.full_name)?
            .build())
    }
}
