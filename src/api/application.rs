//! Application API handlers

use crate::api::listing::{self, ListResponse};
use crate::api::{created, EntityPath, PageParams, SearchParams, ValidJson, API_PREFIX};
use crate::domain::{
    ensure_unchanged, Application, AssignOwnerInput, CreateApplicationInput, EntityId,
    UpdateApplicationInput, User,
};
use crate::error::{AppError, Result};
use crate::middleware::auth::Principal;
use crate::policy::{require_entity_input, AccessControl, ResourceKind};
use crate::query::{Criteria, Field};
use crate::repository::{ApplicationRepository, EntityStore};
use crate::state::HasRepositories;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

const SORTS: &[Field] = &[Field::CreatedDate, Field::ModifiedDate, Field::Name, Field::Id];
const SEARCH_FIELDS: &[Field] = &[Field::Name, Field::Description];

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationFilters {
    pub owner: Option<EntityId>,
}

fn access(principal: &Principal) -> Result<AccessControl<'_>> {
    let ac = AccessControl::new(principal, ResourceKind::Application);
    ac.require_scope()?;
    Ok(ac)
}

async fn filter_criteria<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    filters: &ApplicationFilters,
) -> Result<Criteria> {
    let ownership = ac
        .resolve_ownership_filter(state.user_repo(), filters.owner)
        .await?;
    Ok(Criteria::new().equals_opt(Field::Owner, ownership.owner_id()))
}

async fn load<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    id: EntityId,
) -> Result<Application> {
    let application = state.application_repo().find_by_id(id).await?;
    ac.assert_can_access(application, ac.policy().admin)
}

/// List applications
pub async fn list<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(filters): Query<ApplicationFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let criteria = filter_criteria(&state, &ac, &filters).await?;
    let page = listing::browse(state.application_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Search applications by name and description
pub async fn search<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(search): Query<SearchParams>,
    Query(filters): Query<ApplicationFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let query = search.query()?;
    let mut criteria = filter_criteria(&state, &ac, &filters).await?;
    criteria.push(query.into_predicate(SEARCH_FIELDS));
    let page = listing::browse(state.application_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Get application by ID
pub async fn get<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    Ok(Json(load(&state, &ac, id).await?))
}

/// Create application
pub async fn create<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    ValidJson(input): ValidJson<CreateApplicationInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let owner_id = ac
        .resolve_owner_assignment(state.user_repo(), input.owner_id)
        .await?;

    let application = state
        .application_repo()
        .create(&Application {
            name: input.name,
            description: input.description,
            owner_id,
            ..Default::default()
        })
        .await?;

    tracing::info!(application_id = %application.id, owner_id = ?owner_id, "Application created");
    Ok(created(
        format!("{}/application/{}", API_PREFIX, application.id),
        application,
    ))
}

/// Update application name and description
pub async fn update<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
    ValidJson(input): ValidJson<UpdateApplicationInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let current = load(&state, &ac, id).await?;
    state.admin_app().assert_mutable(current.id)?;
    ensure_unchanged("id", Some(&current.id), input.id.as_ref())?;
    ensure_unchanged("owner_id", current.owner_id.as_ref(), input.owner_id.as_ref())?;

    let application = state
        .application_repo()
        .update(&Application {
            name: input.name.unwrap_or(current.name),
            description: input.description.or(current.description),
            ..current
        })
        .await?;
    Ok(Json(application))
}

/// Reassign the owner of an application. Admin scope only.
pub async fn assign_owner<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
    ValidJson(input): ValidJson<AssignOwnerInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    if !ac.is_admin() {
        return Err(AppError::InvalidScope(format!(
            "Reassigning an owner requires the '{}' scope",
            ac.policy().admin
        )));
    }
    let current = load(&state, &ac, id).await?;
    state.admin_app().assert_mutable(current.id)?;

    let owner: User =
        require_entity_input(state.user_repo(), "owner_id", Some(input.owner_id)).await?;
    let application = state
        .application_repo()
        .update_owner(current.id, Some(owner.id))
        .await?;

    tracing::info!(application_id = %application.id, owner_id = %owner.id, "Application owner reassigned");
    Ok(Json(application))
}

/// Delete application and everything it contains
pub async fn delete<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let current = load(&state, &ac, id).await?;
    state.admin_app().assert_mutable(current.id)?;

    state.application_repo().delete(current.id).await?;
    tracing::info!(application_id = %current.id, "Application deleted");
    Ok(StatusCode::NO_CONTENT)
}
