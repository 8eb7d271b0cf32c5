//! User identity API handlers

use crate::api::listing::{self, ListResponse};
use crate::api::{created, EntityPath, PageParams, SearchParams, ValidJson, API_PREFIX};
use crate::domain::{
    ensure_unchanged, password_hash_for, CreateIdentityInput, EntityId, IdentityType,
    UpdateIdentityInput, User, UserIdentity,
};
use crate::error::Result;
use crate::middleware::auth::Principal;
use crate::policy::{require_entity_input, AccessControl, ResourceKind};
use crate::query::{Criteria, Field};
use crate::repository::{EntityStore, IdentityRepository};
use crate::state::HasRepositories;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

const SORTS: &[Field] = &[
    Field::CreatedDate,
    Field::ModifiedDate,
    Field::RemoteId,
    Field::Type,
    Field::Id,
];
const SEARCH_FIELDS: &[Field] = &[Field::RemoteId];

#[derive(Debug, Default, Deserialize)]
pub struct IdentityFilters {
    pub owner: Option<EntityId>,
    pub user: Option<EntityId>,
    #[serde(rename = "type")]
    pub identity_type: Option<IdentityType>,
}

fn access(principal: &Principal) -> Result<AccessControl<'_>> {
    let ac = AccessControl::new(principal, ResourceKind::Identity);
    ac.require_scope()?;
    Ok(ac)
}

async fn filter_criteria<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    filters: &IdentityFilters,
) -> Result<Criteria> {
    let ownership = ac
        .resolve_ownership_filter(state.user_repo(), filters.owner)
        .await?;
    let user: Option<User> = ac
        .resolve_filter_entity(state.user_repo(), "user", filters.user)
        .await?;

    Ok(Criteria::new()
        .equals_opt(Field::Owner, ownership.owner_id())
        .equals_opt(Field::User, user.map(|u| u.id))
        .equals_opt(Field::Type, filters.identity_type))
}

async fn load<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    id: EntityId,
) -> Result<UserIdentity> {
    let identity = state.identity_repo().find_by_id(id).await?;
    ac.assert_can_access(identity, ac.policy().admin)
}

/// List identities
pub async fn list<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(filters): Query<IdentityFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let criteria = filter_criteria(&state, &ac, &filters).await?;
    let page = listing::browse(state.identity_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Search identities by remote id
pub async fn search<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(search): Query<SearchParams>,
    Query(filters): Query<IdentityFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let query = search.query()?;
    let mut criteria = filter_criteria(&state, &ac, &filters).await?;
    criteria.push(query.into_predicate(SEARCH_FIELDS));
    let page = listing::browse(state.identity_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Get identity by ID
pub async fn get<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    Ok(Json(load(&state, &ac, id).await?))
}

/// Create identity for a user
pub async fn create<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    ValidJson(input): ValidJson<CreateIdentityInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let user: User = require_entity_input(state.user_repo(), "user_id", input.user_id).await?;
    let user = ac.assert_can_access_subresource(Some(user), ac.policy().admin)?;
    state.admin_app().assert_mutable(user.application_id)?;
    let password_hash = password_hash_for(input.identity_type, input.password.as_deref())?;

    let identity = state
        .identity_repo()
        .create(&UserIdentity {
            user_id: user.id,
            identity_type: input.identity_type,
            remote_id: input.remote_id,
            claims: input.claims,
            password_hash,
            application_id: user.application_id,
            owner_id: user.owner_id,
            ..Default::default()
        })
        .await?;

    tracing::info!(identity_id = %identity.id, user_id = %user.id, "Identity created");
    Ok(created(
        format!("{}/identity/{}", API_PREFIX, identity.id),
        identity,
    ))
}

/// Update remote id, claims and (for password identities) the password
pub async fn update<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
    ValidJson(input): ValidJson<UpdateIdentityInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let current = load(&state, &ac, id).await?;
    state.admin_app().assert_mutable(current.application_id)?;
    ensure_unchanged("id", Some(&current.id), input.id.as_ref())?;
    ensure_unchanged("user_id", Some(&current.user_id), input.user_id.as_ref())?;
    ensure_unchanged(
        "type",
        Some(&current.identity_type),
        input.identity_type.as_ref(),
    )?;

    let password_hash = match input.password.as_deref() {
        Some(password) => password_hash_for(current.identity_type, Some(password))?,
        None => current.password_hash.clone(),
    };

    let identity = state
        .identity_repo()
        .update(&UserIdentity {
            remote_id: input.remote_id.unwrap_or(current.remote_id),
            claims: input.claims.unwrap_or(current.claims),
            password_hash,
            ..current
        })
        .await?;
    Ok(Json(identity))
}

/// Delete identity and the tokens issued to it
pub async fn delete<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let current = load(&state, &ac, id).await?;
    state.admin_app().assert_mutable(current.application_id)?;

    state.identity_repo().delete(current.id).await?;
    tracing::info!(identity_id = %current.id, "Identity deleted");
    Ok(StatusCode::NO_CONTENT)
}
