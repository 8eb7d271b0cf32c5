//! Application scope API handlers

use crate::api::listing::{self, ListResponse};
use crate::api::{created, EntityPath, PageParams, SearchParams, ValidJson, API_PREFIX};
use crate::domain::{
    ensure_unchanged, Application, ApplicationScope, CreateScopeInput, EntityId, UpdateScopeInput,
};
use crate::error::Result;
use crate::middleware::auth::Principal;
use crate::policy::{require_entity_input, AccessControl, ResourceKind};
use crate::query::{Criteria, Field};
use crate::repository::{EntityStore, ScopeRepository};
use crate::state::HasRepositories;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

const SORTS: &[Field] = &[Field::CreatedDate, Field::ModifiedDate, Field::Name, Field::Id];
const SEARCH_FIELDS: &[Field] = &[Field::Name];

#[derive(Debug, Default, Deserialize)]
pub struct ScopeFilters {
    pub owner: Option<EntityId>,
    pub application: Option<EntityId>,
}

fn access(principal: &Principal) -> Result<AccessControl<'_>> {
    let ac = AccessControl::new(principal, ResourceKind::Scope);
    ac.require_scope()?;
    Ok(ac)
}

async fn filter_criteria<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    filters: &ScopeFilters,
) -> Result<Criteria> {
    let ownership = ac
        .resolve_ownership_filter(state.user_repo(), filters.owner)
        .await?;
    let application: Option<Application> = ac
        .resolve_filter_entity(state.application_repo(), "application", filters.application)
        .await?;

    Ok(Criteria::new()
        .equals_opt(Field::Owner, ownership.owner_id())
        .equals_opt(Field::Application, application.map(|a| a.id)))
}

async fn load<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    id: EntityId,
) -> Result<ApplicationScope> {
    let scope = state.scope_repo().find_by_id(id).await?;
    ac.assert_can_access(scope, ac.policy().admin)
}

/// List scopes
pub async fn list<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(filters): Query<ScopeFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let criteria = filter_criteria(&state, &ac, &filters).await?;
    let page = listing::browse(state.scope_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Search scopes by name
pub async fn search<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(search): Query<SearchParams>,
    Query(filters): Query<ScopeFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let query = search.query()?;
    let mut criteria = filter_criteria(&state, &ac, &filters).await?;
    criteria.push(query.into_predicate(SEARCH_FIELDS));
    let page = listing::browse(state.scope_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Get scope by ID
pub async fn get<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    Ok(Json(load(&state, &ac, id).await?))
}

/// Create scope
pub async fn create<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    ValidJson(input): ValidJson<CreateScopeInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let application: Application =
        require_entity_input(state.application_repo(), "application_id", input.application_id)
            .await?;
    let application = ac.assert_can_access_subresource(Some(application), ac.policy().admin)?;
    state.admin_app().assert_mutable(application.id)?;

    let scope = state
        .scope_repo()
        .create(&ApplicationScope {
            application_id: application.id,
            name: input.name,
            owner_id: application.owner_id,
            ..Default::default()
        })
        .await?;

    tracing::info!(scope_id = %scope.id, application_id = %application.id, "Scope created");
    Ok(created(format!("{}/scope/{}", API_PREFIX, scope.id), scope))
}

/// Rename scope
pub async fn update<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
    ValidJson(input): ValidJson<UpdateScopeInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let current = load(&state, &ac, id).await?;
    state.admin_app().assert_mutable(current.application_id)?;
    ensure_unchanged("id", Some(&current.id), input.id.as_ref())?;
    ensure_unchanged(
        "application_id",
        Some(&current.application_id),
        input.application_id.as_ref(),
    )?;

    let scope = state
        .scope_repo()
        .update(&ApplicationScope {
            name: input.name.unwrap_or(current.name),
            ..current
        })
        .await?;
    Ok(Json(scope))
}

/// Delete scope, unlinking it from roles and tokens
pub async fn delete<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let current = load(&state, &ac, id).await?;
    state.admin_app().assert_mutable(current.application_id)?;

    state.scope_repo().delete(current.id).await?;
    tracing::info!(scope_id = %current.id, "Scope deleted");
    Ok(StatusCode::NO_CONTENT)
}
