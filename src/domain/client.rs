//! OAuth2 client and client URI domain models

use super::common::{sortable_timestamp, string_enum, ApplicationBound, EntityId, Owned};
use crate::query::{Field, FieldSource};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

string_enum! {
    /// OAuth2 grant flow a client is registered for
    pub enum ClientType {
        Implicit => "implicit",
        AuthorizationGrant => "authorization_grant",
        OwnerCredentials => "owner_credentials",
        ClientCredentials => "client_credentials",
    }
}

impl ClientType {
    /// Confidential clients authenticate with a server-issued secret
    pub fn is_confidential(&self) -> bool {
        matches!(
            self,
            ClientType::AuthorizationGrant | ClientType::ClientCredentials
        )
    }
}

string_enum! {
    /// Which URI list of a client an entry belongs to
    pub enum ClientUriKind {
        Redirect => "redirect",
        Referrer => "referrer",
    }
}

/// Generate a random client secret (256 bits, URL-safe base64)
pub fn generate_client_secret() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: EntityId,
    pub application_id: EntityId,
    pub name: String,
    #[serde(rename = "type")]
    pub client_type: ClientType,
    pub client_secret: Option<String>,
    /// Owner of the parent application
    pub owner_id: Option<EntityId>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

impl Default for Client {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new_v4(),
            application_id: EntityId::nil(),
            name: String::new(),
            client_type: ClientType::Implicit,
            client_secret: None,
            owner_id: None,
            created_date: now,
            modified_date: now,
        }
    }
}

impl Owned for Client {
    fn owner_id(&self) -> Option<EntityId> {
        self.owner_id
    }
}

impl ApplicationBound for Client {
    fn application_id(&self) -> EntityId {
        self.application_id
    }
}

impl FieldSource for Client {
    fn field_value(&self, field: Field) -> Option<String> {
        match field {
            Field::Id => Some(self.id.to_string()),
            Field::Owner => self.owner_id.map(|id| id.to_string()),
            Field::Application => Some(self.application_id.to_string()),
            Field::Name => Some(self.name.clone()),
            Field::Type => Some(self.client_type.to_string()),
            Field::CreatedDate => Some(sortable_timestamp(&self.created_date)),
            Field::ModifiedDate => Some(sortable_timestamp(&self.modified_date)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateClientInput {
    pub application_id: Option<EntityId>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(rename = "type")]
    pub client_type: ClientType,
}

/// `id`, `application_id` and `type` are immutable
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateClientInput {
    pub id: Option<EntityId>,
    pub application_id: Option<EntityId>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub client_type: Option<ClientType>,
}

/// A redirect or referrer URI registered on a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ClientUri {
    pub id: EntityId,
    pub client_id: EntityId,
    pub kind: ClientUriKind,
    pub uri: String,
    pub application_id: EntityId,
    pub owner_id: Option<EntityId>,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

impl Owned for ClientUri {
    fn owner_id(&self) -> Option<EntityId> {
        self.owner_id
    }
}

impl ApplicationBound for ClientUri {
    fn application_id(&self) -> EntityId {
        self.application_id
    }
}

impl FieldSource for ClientUri {
    fn field_value(&self, field: Field) -> Option<String> {
        match field {
            Field::Id => Some(self.id.to_string()),
            Field::Owner => self.owner_id.map(|id| id.to_string()),
            Field::Application => Some(self.application_id.to_string()),
            Field::Client => Some(self.client_id.to_string()),
            Field::Type => Some(self.kind.to_string()),
            Field::CreatedDate => Some(sortable_timestamp(&self.created_date)),
            Field::ModifiedDate => Some(sortable_timestamp(&self.modified_date)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ClientUriInput {
    /// Must equal the path id when present
    pub id: Option<EntityId>,
    /// Must equal the parent client when present
    pub client_id: Option<EntityId>,
    #[validate(url, length(max = 700))]
    pub uri: String,
}
