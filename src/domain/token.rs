//! OAuth2 token domain model

use super::common::{sortable_timestamp, string_enum, ApplicationBound, EntityId, Owned};
use crate::query::{Field, FieldSource};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Default lifetime of an issued token, in seconds
pub const DEFAULT_EXPIRES_IN: i64 = 3600;

string_enum! {
    pub enum TokenType {
        Bearer => "bearer",
        Authorization => "authorization",
        Refresh => "refresh",
    }
}

/// A token issued to a client, optionally on behalf of an identity.
///
/// Tokens without an identity come from a client-credentials grant and
/// cannot own anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OAuthToken {
    pub id: EntityId,
    pub client_id: EntityId,
    pub identity_id: Option<EntityId>,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub expires_in: i64,
    pub issued_at: DateTime<Utc>,
    pub redirect: Option<String>,
    /// Granted scope names, loaded separately
    #[sqlx(skip)]
    #[serde(default)]
    pub scopes: Vec<String>,
    pub application_id: EntityId,
    pub owner_id: Option<EntityId>,
    /// User behind the identity, if any
    pub user_id: Option<EntityId>,
    pub client_name: String,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

impl Default for OAuthToken {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new_v4(),
            client_id: EntityId::nil(),
            identity_id: None,
            token_type: TokenType::Bearer,
            expires_in: DEFAULT_EXPIRES_IN,
            issued_at: now,
            redirect: None,
            scopes: Vec::new(),
            application_id: EntityId::nil(),
            owner_id: None,
            user_id: None,
            client_name: String::new(),
            created_date: now,
            modified_date: now,
        }
    }
}

impl OAuthToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.expires_in)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() <= now
    }
}

impl Owned for OAuthToken {
    fn owner_id(&self) -> Option<EntityId> {
        self.owner_id
    }
}

impl ApplicationBound for OAuthToken {
    fn application_id(&self) -> EntityId {
        self.application_id
    }
}

impl FieldSource for OAuthToken {
    fn field_value(&self, field: Field) -> Option<String> {
        match field {
            Field::Id => Some(self.id.to_string()),
            Field::Owner => self.owner_id.map(|id| id.to_string()),
            Field::Application => Some(self.application_id.to_string()),
            Field::Client => Some(self.client_id.to_string()),
            Field::Identity => self.identity_id.map(|id| id.to_string()),
            Field::User => self.user_id.map(|id| id.to_string()),
            Field::Type => Some(self.token_type.to_string()),
            Field::ClientName => Some(self.client_name.clone()),
            Field::IssuedAt => Some(sortable_timestamp(&self.issued_at)),
            Field::CreatedDate => Some(sortable_timestamp(&self.created_date)),
            Field::ModifiedDate => Some(sortable_timestamp(&self.modified_date)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTokenInput {
    pub client_id: Option<EntityId>,
    /// Must be an identity of a user in the client's application
    pub identity_id: Option<EntityId>,
    #[serde(rename = "type", default = "default_token_type")]
    pub token_type: TokenType,
    #[validate(range(min = 1, max = 31_536_000))]
    pub expires_in: Option<i64>,
    #[validate(url)]
    pub redirect: Option<String>,
    /// Scope ids; each must belong to the client's application
    #[serde(default)]
    pub scopes: Vec<EntityId>,
}

fn default_token_type() -> TokenType {
    TokenType::Bearer
}
