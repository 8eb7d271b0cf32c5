//! Role and application scope domain models

use super::common::{sortable_timestamp, ApplicationBound, EntityId, Owned};
use crate::query::{Field, FieldSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A named bundle of scopes within an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: EntityId,
    pub application_id: EntityId,
    pub name: String,
    /// Ids of the linked application scopes, loaded separately
    #[sqlx(skip)]
    #[serde(default)]
    pub scopes: Vec<EntityId>,
    pub owner_id: Option<EntityId>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

impl Default for Role {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new_v4(),
            application_id: EntityId::nil(),
            name: String::new(),
            scopes: Vec::new(),
            owner_id: None,
            created_date: now,
            modified_date: now,
        }
    }
}

impl Owned for Role {
    fn owner_id(&self) -> Option<EntityId> {
        self.owner_id
    }
}

impl ApplicationBound for Role {
    fn application_id(&self) -> EntityId {
        self.application_id
    }
}

impl FieldSource for Role {
    fn field_value(&self, field: Field) -> Option<String> {
        match field {
            Field::Id => Some(self.id.to_string()),
            Field::Owner => self.owner_id.map(|id| id.to_string()),
            Field::Application => Some(self.application_id.to_string()),
            Field::Name => Some(self.name.clone()),
            Field::CreatedDate => Some(sortable_timestamp(&self.created_date)),
            Field::ModifiedDate => Some(sortable_timestamp(&self.modified_date)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoleInput {
    pub application_id: Option<EntityId>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Scopes to link; each must belong to the same application
    #[serde(default)]
    pub scopes: Vec<EntityId>,
}

/// `id` and `application_id` are immutable. Scope links are managed through
/// the role scope subresource.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRoleInput {
    pub id: Option<EntityId>,
    pub application_id: Option<EntityId>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
}

/// A permission an application can grant to tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ApplicationScope {
    pub id: EntityId,
    pub application_id: EntityId,
    pub name: String,
    pub owner_id: Option<EntityId>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

impl Default for ApplicationScope {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new_v4(),
            application_id: EntityId::nil(),
            name: String::new(),
            owner_id: None,
            created_date: now,
            modified_date: now,
        }
    }
}

impl Owned for ApplicationScope {
    fn owner_id(&self) -> Option<EntityId> {
        self.owner_id
    }
}

impl ApplicationBound for ApplicationScope {
    fn application_id(&self) -> EntityId {
        self.application_id
    }
}

impl FieldSource for ApplicationScope {
    fn field_value(&self, field: Field) -> Option<String> {
        match field {
            Field::Id => Some(self.id.to_string()),
            Field::Owner => self.owner_id.map(|id| id.to_string()),
            Field::Application => Some(self.application_id.to_string()),
            Field::Name => Some(self.name.clone()),
            Field::CreatedDate => Some(sortable_timestamp(&self.created_date)),
            Field::ModifiedDate => Some(sortable_timestamp(&self.modified_date)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateScopeInput {
    pub application_id: Option<EntityId>,
    #[validate(length(min = 1, max = 128), custom(function = "validate_scope_name"))]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateScopeInput {
    pub id: Option<EntityId>,
    pub application_id: Option<EntityId>,
    #[validate(length(min = 1, max = 128), custom(function = "validate_scope_name"))]
    pub name: Option<String>,
}

/// Scope names are OAuth2 scope tokens: no whitespace or quotes
fn validate_scope_name(name: &str) -> Result<(), validator::ValidationError> {
    if SCOPE_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_scope_name"))
    }
}

lazy_static::lazy_static! {
    pub static ref SCOPE_NAME_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z0-9_:.\-/]+$").unwrap();
}
