//! OAuth2 token API handlers. Tokens are immutable once issued.

use crate::api::listing::{self, ListResponse};
use crate::api::{created, EntityPath, PageParams, SearchParams, ValidJson, API_PREFIX};
use crate::domain::{
    ApplicationScope, Client, CreateTokenInput, EntityId, OAuthToken, TokenType, UserIdentity,
    DEFAULT_EXPIRES_IN,
};
use crate::error::{AppError, Result};
use crate::middleware::auth::Principal;
use crate::policy::{require_entity_input, resolve_entity_input, AccessControl, ResourceKind};
use crate::query::{Criteria, Field};
use crate::repository::{EntityStore, TokenRepository};
use crate::state::HasRepositories;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

const SORTS: &[Field] = &[
    Field::CreatedDate,
    Field::IssuedAt,
    Field::Type,
    Field::ClientName,
    Field::Id,
];
const SEARCH_FIELDS: &[Field] = &[Field::ClientName];

#[derive(Debug, Default, Deserialize)]
pub struct TokenFilters {
    pub owner: Option<EntityId>,
    pub client: Option<EntityId>,
    pub identity: Option<EntityId>,
    #[serde(rename = "type")]
    pub token_type: Option<TokenType>,
}

fn access(principal: &Principal) -> Result<AccessControl<'_>> {
    let ac = AccessControl::new(principal, ResourceKind::Token);
    ac.require_scope()?;
    Ok(ac)
}

async fn filter_criteria<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    filters: &TokenFilters,
) -> Result<Criteria> {
    let ownership = ac
        .resolve_ownership_filter(state.user_repo(), filters.owner)
        .await?;
    let client: Option<Client> = ac
        .resolve_filter_entity(state.client_repo(), "client", filters.client)
        .await?;
    let identity: Option<UserIdentity> = ac
        .resolve_filter_entity(state.identity_repo(), "identity", filters.identity)
        .await?;

    Ok(Criteria::new()
        .equals_opt(Field::Owner, ownership.owner_id())
        .equals_opt(Field::Client, client.map(|c| c.id))
        .equals_opt(Field::Identity, identity.map(|i| i.id))
        .equals_opt(Field::Type, filters.token_type))
}

async fn load<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    id: EntityId,
) -> Result<OAuthToken> {
    let token = state.token_repo().find_by_id(id).await?;
    ac.assert_can_access(token, ac.policy().admin)
}

/// List tokens
pub async fn list<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(filters): Query<TokenFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let criteria = filter_criteria(&state, &ac, &filters).await?;
    let page = listing::browse(state.token_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Search tokens by client name
pub async fn search<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(search): Query<SearchParams>,
    Query(filters): Query<TokenFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let query = search.query()?;
    let mut criteria = filter_criteria(&state, &ac, &filters).await?;
    criteria.push(query.into_predicate(SEARCH_FIELDS));
    let page = listing::browse(state.token_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Get token by ID
pub async fn get<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    Ok(Json(load(&state, &ac, id).await?))
}

/// Issue a token for a client, optionally on behalf of an identity
pub async fn create<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    ValidJson(input): ValidJson<CreateTokenInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let client: Client = require_entity_input(state.client_repo(), "client_id", input.client_id).await?;
    let client = ac.assert_can_access_subresource(Some(client), ac.policy().admin)?;
    state.admin_app().assert_mutable(client.application_id)?;

    let identity: Option<UserIdentity> =
        resolve_entity_input(state.identity_repo(), "identity_id", input.identity_id).await?;
    if let Some(identity) = &identity {
        if identity.application_id != client.application_id {
            return Err(AppError::BadRequest(
                "Identity belongs to a different application than the client".to_string(),
            ));
        }
    }

    let mut scope_ids = Vec::with_capacity(input.scopes.len());
    for scope_id in input.scopes {
        let scope: ApplicationScope =
            require_entity_input(state.scope_repo(), "scopes", Some(scope_id)).await?;
        if scope.application_id != client.application_id {
            return Err(AppError::BadRequest(format!(
                "Scope '{}' belongs to a different application than the client",
                scope.name
            )));
        }
        if !scope_ids.contains(&scope.id) {
            scope_ids.push(scope.id);
        }
    }

    let now = Utc::now();
    let token = OAuthToken {
        client_id: client.id,
        identity_id: identity.as_ref().map(|i| i.id),
        token_type: input.token_type,
        expires_in: input.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        issued_at: now,
        redirect: input.redirect,
        application_id: client.application_id,
        owner_id: client.owner_id,
        user_id: identity.as_ref().map(|i| i.user_id),
        client_name: client.name.clone(),
        created_date: now,
        modified_date: now,
        ..Default::default()
    };
    let token = state.token_repo().create(&token, &scope_ids).await?;

    tracing::info!(token_id = %token.id, client_id = %client.id, "Token issued");
    Ok(created(format!("{}/token/{}", API_PREFIX, token.id), token))
}

/// Revoke a token
pub async fn delete<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let current = load(&state, &ac, id).await?;
    state.admin_app().assert_mutable(current.application_id)?;

    state.token_repo().delete(current.id).await?;
    tracing::info!(token_id = %current.id, "Token revoked");
    Ok(StatusCode::NO_CONTENT)
}
