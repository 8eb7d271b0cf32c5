//! Role API handlers, including the role/scope links

use crate::api::listing::{self, ListResponse};
use crate::api::{
    created, path_param, raw_path_params, EntityPath, PageParams, SearchParams, ValidJson,
    API_PREFIX,
};
use crate::domain::{
    ensure_unchanged, Application, ApplicationScope, CreateRoleInput, EntityId, Role,
    UpdateRoleInput,
};
use crate::error::{AppError, Result};
use crate::middleware::auth::Principal;
use crate::policy::{require_entity_input, AccessControl, ResourceKind};
use crate::query::{Criteria, Field};
use crate::repository::{EntityStore, RoleRepository};
use crate::state::HasRepositories;
use axum::{
    extract::{FromRequestParts, Query, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

const SORTS: &[Field] = &[Field::CreatedDate, Field::ModifiedDate, Field::Name, Field::Id];
const SEARCH_FIELDS: &[Field] = &[Field::Name];

#[derive(Debug, Default, Deserialize)]
pub struct RoleFilters {
    pub owner: Option<EntityId>,
    pub application: Option<EntityId>,
}

/// `/role/{id}/scope/{scope_id}`
#[derive(Debug, Clone, Copy)]
pub struct RoleScopePath {
    pub role_id: EntityId,
    pub scope_id: EntityId,
}

impl<S: Send + Sync> FromRequestParts<S> for RoleScopePath {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let params = raw_path_params(parts, state).await?;
        Ok(Self {
            role_id: path_param(&params, "id")?,
            scope_id: path_param(&params, "scope_id")?,
        })
    }
}

fn access(principal: &Principal) -> Result<AccessControl<'_>> {
    let ac = AccessControl::new(principal, ResourceKind::Role);
    ac.require_scope()?;
    Ok(ac)
}

async fn filter_criteria<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    filters: &RoleFilters,
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

async fn load<S: HasRepositories>(state: &S, ac: &AccessControl<'_>, id: EntityId) -> Result<Role> {
    let role = state.role_repo().find_by_id(id).await?;
    ac.assert_can_access(role, ac.policy().admin)
}

/// Resolve a scope reference that must belong to the given application
async fn scope_of_application<S: HasRepositories>(
    state: &S,
    application_id: EntityId,
    scope_id: EntityId,
) -> Result<ApplicationScope> {
    let scope: ApplicationScope =
        require_entity_input(state.scope_repo(), "scope", Some(scope_id)).await?;
    if scope.application_id != application_id {
        return Err(AppError::BadRequest(format!(
            "Scope '{}' belongs to a different application",
            scope.name
        )));
    }
    Ok(scope)
}

/// List roles
pub async fn list<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(filters): Query<RoleFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let criteria = filter_criteria(&state, &ac, &filters).await?;
    let page = listing::browse(state.role_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Search roles by name
pub async fn search<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(search): Query<SearchParams>,
    Query(filters): Query<RoleFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let query = search.query()?;
    let mut criteria = filter_criteria(&state, &ac, &filters).await?;
    criteria.push(query.into_predicate(SEARCH_FIELDS));
    let page = listing::browse(state.role_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Get role by ID
pub async fn get<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    Ok(Json(load(&state, &ac, id).await?))
}

/// Create role, optionally linked to scopes of the same application
pub async fn create<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    ValidJson(input): ValidJson<CreateRoleInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let application: Application =
        require_entity_input(state.application_repo(), "application_id", input.application_id)
            .await?;
    let application = ac.assert_can_access_subresource(Some(application), ac.policy().admin)?;
    state.admin_app().assert_mutable(application.id)?;

    let mut scopes = Vec::with_capacity(input.scopes.len());
    for scope_id in input.scopes {
        let scope = scope_of_application(&state, application.id, scope_id).await?;
        if !scopes.contains(&scope.id) {
            scopes.push(scope.id);
        }
    }

    let role = state
        .role_repo()
        .create(&Role {
            application_id: application.id,
            name: input.name,
            scopes,
            owner_id: application.owner_id,
            ..Default::default()
        })
        .await?;

    tracing::info!(role_id = %role.id, application_id = %application.id, "Role created");
    Ok(created(format!("{}/role/{}", API_PREFIX, role.id), role))
}

/// Rename role
pub async fn update<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
    ValidJson(input): ValidJson<UpdateRoleInput>,
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

    let role = state
        .role_repo()
        .update(&Role {
            name: input.name.unwrap_or(current.name),
            ..current
        })
        .await?;
    Ok(Json(role))
}

/// Delete role. Users holding it keep their account without a role.
pub async fn delete<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let current = load(&state, &ac, id).await?;
    state.admin_app().assert_mutable(current.application_id)?;

    state.role_repo().delete(current.id).await?;
    tracing::info!(role_id = %current.id, "Role deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn load_parent<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    role_id: EntityId,
) -> Result<Role> {
    let role = state.role_repo().find_by_id(role_id).await?;
    let role = ac.assert_can_access_subresource(role, ac.policy().admin)?;
    state.admin_app().assert_mutable(role.application_id)?;
    Ok(role)
}

/// Link a scope to a role
pub async fn add_scope<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    path: RoleScopePath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let role = load_parent(&state, &ac, path.role_id).await?;
    let scope = scope_of_application(&state, role.application_id, path.scope_id).await?;

    let role = state.role_repo().add_scope(role.id, scope.id).await?;
    Ok(Json(role))
}

/// Unlink a scope from a role
pub async fn remove_scope<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    path: RoleScopePath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let role = load_parent(&state, &ac, path.role_id).await?;

    state.role_repo().remove_scope(role.id, path.scope_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
