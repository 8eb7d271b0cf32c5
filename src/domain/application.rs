//! Application domain model

use super::common::{sortable_timestamp, ApplicationBound, EntityId, Owned};
use crate::query::{Field, FieldSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Top-level container for clients, users, roles and scopes.
///
/// The only entity with a direct owner; every other kind inherits its owner
/// from the application it lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<EntityId>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

impl Default for Application {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new_v4(),
            name: String::new(),
            description: None,
            owner_id: None,
            created_date: now,
            modified_date: now,
        }
    }
}

impl Owned for Application {
    fn owner_id(&self) -> Option<EntityId> {
        self.owner_id
    }
}

impl ApplicationBound for Application {
    fn application_id(&self) -> EntityId {
        self.id
    }
}

impl FieldSource for Application {
    fn field_value(&self, field: Field) -> Option<String> {
        match field {
            Field::Id => Some(self.id.to_string()),
            Field::Owner => self.owner_id.map(|id| id.to_string()),
            Field::Name => Some(self.name.clone()),
            Field::Description => self.description.clone(),
            Field::CreatedDate => Some(sortable_timestamp(&self.created_date)),
            Field::ModifiedDate => Some(sortable_timestamp(&self.modified_date)),
            _ => None,
        }
    }
}

/// Input for creating an application
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateApplicationInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    /// Defaults to the caller's user
    pub owner_id: Option<EntityId>,
}

/// Input for updating an application. `id` and `owner_id` may be echoed back
/// but never changed.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateApplicationInput {
    pub id: Option<EntityId>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    pub owner_id: Option<EntityId>,
}

/// Input for the explicit owner reassignment path
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignOwnerInput {
    pub owner_id: EntityId,
}
