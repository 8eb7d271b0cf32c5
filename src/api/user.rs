//! User API handlers

use crate::api::listing::{self, ListResponse};
use crate::api::{created, EntityPath, PageParams, SearchParams, ValidJson, API_PREFIX};
use crate::domain::{
    ensure_unchanged, Application, CreateUserInput, EntityId, Role, UpdateUserInput, User,
};
use crate::error::{AppError, Result};
use crate::middleware::auth::Principal;
use crate::policy::{require_entity_input, resolve_entity_input, AccessControl, ResourceKind};
use crate::query::{Criteria, Field};
use crate::repository::{EntityStore, UserRepository};
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
    Field::Name,
    Field::Email,
    Field::Id,
];
const SEARCH_FIELDS: &[Field] = &[Field::Name, Field::Email];

#[derive(Debug, Default, Deserialize)]
pub struct UserFilters {
    pub owner: Option<EntityId>,
    pub application: Option<EntityId>,
    pub role: Option<EntityId>,
}

fn access(principal: &Principal) -> Result<AccessControl<'_>> {
    let ac = AccessControl::new(principal, ResourceKind::User);
    ac.require_scope()?;
    Ok(ac)
}

async fn filter_criteria<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    filters: &UserFilters,
) -> Result<Criteria> {
    let ownership = ac
        .resolve_ownership_filter(state.user_repo(), filters.owner)
        .await?;
    let application: Option<Application> = ac
        .resolve_filter_entity(state.application_repo(), "application", filters.application)
        .await?;
    let role: Option<Role> = ac
        .resolve_filter_entity(state.role_repo(), "role", filters.role)
        .await?;

    Ok(Criteria::new()
        .equals_opt(Field::Owner, ownership.owner_id())
        .equals_opt(Field::Application, application.map(|a| a.id))
        .equals_opt(Field::Role, role.map(|r| r.id)))
}

async fn load<S: HasRepositories>(state: &S, ac: &AccessControl<'_>, id: EntityId) -> Result<User> {
    let user = state.user_repo().find_by_id(id).await?;
    ac.assert_can_access(user, ac.policy().admin)
}

/// Resolve an optional role reference, which must live in the user's application
async fn resolve_role<S: HasRepositories>(
    state: &S,
    application_id: EntityId,
    role_id: Option<EntityId>,
) -> Result<Option<Role>> {
    let role: Option<Role> = resolve_entity_input(state.role_repo(), "role_id", role_id).await?;
    match role {
        Some(role) if role.application_id != application_id => Err(AppError::BadRequest(
            "Role belongs to a different application".to_string(),
        )),
        other => Ok(other),
    }
}

/// List users
pub async fn list<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(filters): Query<UserFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let criteria = filter_criteria(&state, &ac, &filters).await?;
    let page = listing::browse(state.user_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Search users by name and email
pub async fn search<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(search): Query<SearchParams>,
    Query(filters): Query<UserFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let query = search.query()?;
    let mut criteria = filter_criteria(&state, &ac, &filters).await?;
    criteria.push(query.into_predicate(SEARCH_FIELDS));
    let page = listing::browse(state.user_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Get user by ID
pub async fn get<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    Ok(Json(load(&state, &ac, id).await?))
}

/// Create user
pub async fn create<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    ValidJson(input): ValidJson<CreateUserInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let application: Application =
        require_entity_input(state.application_repo(), "application_id", input.application_id)
            .await?;
    let application = ac.assert_can_access_subresource(Some(application), ac.policy().admin)?;
    state.admin_app().assert_mutable(application.id)?;
    let role = resolve_role(&state, application.id, input.role_id).await?;

    let user = state
        .user_repo()
        .create(&User {
            application_id: application.id,
            role_id: role.map(|r| r.id),
            name: input.name,
            email: input.email,
            owner_id: application.owner_id,
            ..Default::default()
        })
        .await?;

    tracing::info!(user_id = %user.id, application_id = %application.id, "User created");
    Ok(created(format!("{}/user/{}", API_PREFIX, user.id), user))
}

/// Update user role, name and email
pub async fn update<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
    ValidJson(input): ValidJson<UpdateUserInput>,
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

    let role_id = match input.role_id {
        Some(role_id) => resolve_role(&state, current.application_id, Some(role_id))
            .await?
            .map(|r| r.id),
        None => current.role_id,
    };

    let user = state
        .user_repo()
        .update(&User {
            role_id,
            name: input.name.or(current.name),
            email: input.email.or(current.email),
            ..current
        })
        .await?;
    Ok(Json(user))
}

/// Delete user with its identities and their tokens
pub async fn delete<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let current = load(&state, &ac, id).await?;
    state.admin_app().assert_mutable(current.application_id)?;

    state.user_repo().delete(current.id).await?;
    tracing::info!(user_id = %current.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
