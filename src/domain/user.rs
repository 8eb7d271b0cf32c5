//! User domain model

use super::common::{sortable_timestamp, ApplicationBound, EntityId, Owned};
use crate::query::{Field, FieldSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A user registered in an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: EntityId,
    pub application_id: EntityId,
    pub role_id: Option<EntityId>,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Owner of the parent application
    pub owner_id: Option<EntityId>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new_v4(),
            application_id: EntityId::nil(),
            role_id: None,
            name: None,
            email: None,
            owner_id: None,
            created_date: now,
            modified_date: now,
        }
    }
}

impl Owned for User {
    fn owner_id(&self) -> Option<EntityId> {
        self.owner_id
    }
}

impl ApplicationBound for User {
    fn application_id(&self) -> EntityId {
        self.application_id
    }
}

impl FieldSource for User {
    fn field_value(&self, field: Field) -> Option<String> {
        match field {
            Field::Id => Some(self.id.to_string()),
            Field::Owner => self.owner_id.map(|id| id.to_string()),
            Field::Application => Some(self.application_id.to_string()),
            Field::Role => self.role_id.map(|id| id.to_string()),
            Field::Name => self.name.clone(),
            Field::Email => self.email.clone(),
            Field::CreatedDate => Some(sortable_timestamp(&self.created_date)),
            Field::ModifiedDate => Some(sortable_timestamp(&self.modified_date)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserInput {
    pub application_id: Option<EntityId>,
    /// Must be a role of the same application
    pub role_id: Option<EntityId>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// `id` and `application_id` are immutable
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserInput {
    pub id: Option<EntityId>,
    pub application_id: Option<EntityId>,
    pub role_id: Option<EntityId>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}
