//! Bearer token authentication
//!
//! Provides the `Principal` extractor. The bearer value is the id of a stored
//! `bearer` token issued by a client of the admin application; its granted
//! scope names become the caller's scopes.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::domain::{EntityId, OAuthToken, TokenType};
use crate::error::AppError;
use crate::policy::AdminAppId;
use crate::repository::EntityStore;
use crate::state::HasRepositories;

/// The authenticated caller of an admin API request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub token_id: EntityId,
    pub client_id: EntityId,
    /// User behind the token's identity. Client-credentials tokens have none.
    pub user_id: Option<EntityId>,
    pub scopes: HashSet<String>,
}

impl Principal {
    pub fn from_token(token: &OAuthToken) -> Self {
        Self {
            token_id: token.id,
            client_id: token.client_id,
            user_id: token.user_id,
            scopes: token.scopes.iter().cloned().collect(),
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}

/// Authentication errors
#[derive(Debug)]
pub enum AuthError {
    /// No Authorization header present
    MissingToken,
    /// Invalid Authorization header format
    InvalidHeader(String),
    /// Unknown, malformed or non-bearer token
    InvalidToken(String),
    /// Token has expired
    TokenExpired,
    /// The token store could not be queried
    Store(AppError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Missing authorization token",
            AuthError::InvalidHeader(_) => "Invalid authorization header",
            AuthError::InvalidToken(_) => "Invalid token",
            AuthError::TokenExpired => "Token has expired",
            AuthError::Store(err) => return err.into_response(),
        };

        let body = serde_json::json!({
            "error": "unauthorized",
            "message": message,
        });

        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

/// Extract the Bearer token from the Authorization header
fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader("Invalid header encoding".to_string()))?;

    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidHeader(
            "Authorization header must use Bearer scheme".to_string(),
        )),
    }
}

/// Turn a looked-up token into a principal, rejecting anything that is not a
/// live bearer token of the admin application
fn authenticate(
    token: Option<OAuthToken>,
    admin_app: AdminAppId,
    now: DateTime<Utc>,
) -> Result<Principal, AuthError> {
    let token = token.ok_or_else(|| AuthError::InvalidToken("Unknown token".to_string()))?;
    // Scope names are only unique per application
    if !admin_app.is_admin_app(token.application_id) {
        return Err(AuthError::InvalidToken(
            "Token was not issued for the admin application".to_string(),
        ));
    }
    if token.token_type != TokenType::Bearer {
        return Err(AuthError::InvalidToken(format!(
            "A {} token cannot be used as a bearer token",
            token.token_type
        )));
    }
    if token.is_expired(now) {
        return Err(AuthError::TokenExpired);
    }
    Ok(Principal::from_token(&token))
}

impl<S> FromRequestParts<S> for Principal
where
    S: HasRepositories,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let raw = extract_bearer_token(&parts.headers)?;
        let token_id: EntityId = raw
            .parse()
            .map_err(|_| AuthError::InvalidToken("Malformed token".to_string()))?;

        let token = state
            .token_repo()
            .find_by_id(token_id)
            .await
            .map_err(AuthError::Store)?;

        let principal = authenticate(token, state.admin_app(), Utc::now())?;
        tracing::debug!(
            token_id = %principal.token_id,
            user_id = ?principal.user_id,
            "Authenticated request"
        );
        Ok(principal)
    }
}
