//! User identity domain model

use super::common::{sortable_timestamp, string_enum, ApplicationBound, EntityId, Owned};
use crate::error::{AppError, Result};
use crate::query::{Field, FieldSource};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use validator::Validate;

string_enum! {
    /// Authentication provider behind an identity
    pub enum IdentityType {
        Password => "password",
        Google => "google",
        Facebook => "facebook",
        Github => "github",
        Test => "test",
    }
}

/// A way for a user to authenticate. Every identity belongs to exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserIdentity {
    pub id: EntityId,
    pub user_id: EntityId,
    #[serde(rename = "type")]
    pub identity_type: IdentityType,
    pub remote_id: String,
    #[sqlx(json)]
    pub claims: HashMap<String, String>,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub application_id: EntityId,
    pub owner_id: Option<EntityId>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

impl Default for UserIdentity {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new_v4(),
            user_id: EntityId::nil(),
            identity_type: IdentityType::Password,
            remote_id: String::new(),
            claims: HashMap::new(),
            password_hash: None,
            application_id: EntityId::nil(),
            owner_id: None,
            created_date: now,
            modified_date: now,
        }
    }
}

impl Owned for UserIdentity {
    fn owner_id(&self) -> Option<EntityId> {
        self.owner_id
    }
}

impl ApplicationBound for UserIdentity {
    fn application_id(&self) -> EntityId {
        self.application_id
    }
}

impl FieldSource for UserIdentity {
    fn field_value(&self, field: Field) -> Option<String> {
        match field {
            Field::Id => Some(self.id.to_string()),
            Field::Owner => self.owner_id.map(|id| id.to_string()),
            Field::Application => Some(self.application_id.to_string()),
            Field::User => Some(self.user_id.to_string()),
            Field::Type => Some(self.identity_type.to_string()),
            Field::RemoteId => Some(self.remote_id.clone()),
            Field::CreatedDate => Some(sortable_timestamp(&self.created_date)),
            Field::ModifiedDate => Some(sortable_timestamp(&self.modified_date)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateIdentityInput {
    pub user_id: Option<EntityId>,
    #[serde(rename = "type")]
    pub identity_type: IdentityType,
    #[validate(length(min = 1, max = 255))]
    pub remote_id: String,
    #[serde(default)]
    pub claims: HashMap<String, String>,
    /// Required for `password` identities, rejected for the others
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

/// `id`, `user_id` and `type` are immutable
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateIdentityInput {
    pub id: Option<EntityId>,
    pub user_id: Option<EntityId>,
    #[serde(rename = "type")]
    pub identity_type: Option<IdentityType>,
    #[validate(length(min = 1, max = 255))]
    pub remote_id: Option<String>,
    pub claims: Option<HashMap<String, String>>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

/// Check the password rule for an identity type, returning the hash to store.
pub fn password_hash_for(
    identity_type: IdentityType,
    password: Option<&str>,
) -> Result<Option<String>> {
    match (identity_type, password) {
        (IdentityType::Password, Some(password)) => hash_password(password).map(Some),
        (IdentityType::Password, None) => Err(AppError::BadRequest(
            "A password identity requires a password".to_string(),
        )),
        (_, Some(_)) => Err(AppError::BadRequest(format!(
            "A {} identity does not take a password",
            identity_type
        ))),
        (_, None) => Ok(None),
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    use argon2::{PasswordHash, PasswordVerifier};

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
