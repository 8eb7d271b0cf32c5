//! Client API handlers

use crate::api::listing::{self, ListResponse};
use crate::api::{created, EntityPath, PageParams, SearchParams, ValidJson, API_PREFIX};
use crate::domain::{
    ensure_unchanged, generate_client_secret, Application, Client, CreateClientInput, EntityId,
    UpdateClientInput,
};
use crate::error::Result;
use crate::middleware::auth::Principal;
use crate::policy::{require_entity_input, AccessControl, ResourceKind};
use crate::query::{Criteria, Field};
use crate::repository::{ClientRepository, EntityStore};
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
    Field::Type,
    Field::Id,
];
const SEARCH_FIELDS: &[Field] = &[Field::Name];

#[derive(Debug, Default, Deserialize)]
pub struct ClientFilters {
    pub owner: Option<EntityId>,
    pub application: Option<EntityId>,
}

fn access(principal: &Principal) -> Result<AccessControl<'_>> {
    let ac = AccessControl::new(principal, ResourceKind::Client);
    ac.require_scope()?;
    Ok(ac)
}

async fn filter_criteria<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    filters: &ClientFilters,
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

/// Load a client the caller may see
pub(crate) async fn load<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    id: EntityId,
) -> Result<Client> {
    let client = state.client_repo().find_by_id(id).await?;
    ac.assert_can_access(client, ac.policy().admin)
}

/// List clients
pub async fn list<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(filters): Query<ClientFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let criteria = filter_criteria(&state, &ac, &filters).await?;
    let page = listing::browse(state.client_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Search clients by name
pub async fn search<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    Query(page): Query<PageParams>,
    Query(search): Query<SearchParams>,
    Query(filters): Query<ClientFilters>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let query = search.query()?;
    let mut criteria = filter_criteria(&state, &ac, &filters).await?;
    criteria.push(query.into_predicate(SEARCH_FIELDS));
    let page = listing::browse(state.client_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Get client by ID
pub async fn get<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    Ok(Json(load(&state, &ac, id).await?))
}

/// Create client. Confidential client types receive a generated secret.
pub async fn create<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    ValidJson(input): ValidJson<CreateClientInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let application: Application =
        require_entity_input(state.application_repo(), "application_id", input.application_id)
            .await?;
    let application = ac.assert_can_access_subresource(Some(application), ac.policy().admin)?;
    state.admin_app().assert_mutable(application.id)?;

    let client_secret = input
        .client_type
        .is_confidential()
        .then(generate_client_secret);
    let client = state
        .client_repo()
        .create(&Client {
            application_id: application.id,
            name: input.name,
            client_type: input.client_type,
            client_secret,
            owner_id: application.owner_id,
            ..Default::default()
        })
        .await?;

    tracing::info!(client_id = %client.id, application_id = %application.id, "Client created");
    Ok(created(format!("{}/client/{}", API_PREFIX, client.id), client))
}

/// Update client name
pub async fn update<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
    ValidJson(input): ValidJson<UpdateClientInput>,
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
    ensure_unchanged("type", Some(&current.client_type), input.client_type.as_ref())?;

    let client = state
        .client_repo()
        .update(&Client {
            name: input.name.unwrap_or(current.name),
            ..current
        })
        .await?;
    Ok(Json(client))
}

/// Delete client with its URIs and tokens
pub async fn delete<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    EntityPath(id): EntityPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let current = load(&state, &ac, id).await?;
    state.admin_app().assert_mutable(current.application_id)?;

    state.client_repo().delete(current.id).await?;
    tracing::info!(client_id = %current.id, "Client deleted");
    Ok(StatusCode::NO_CONTENT)
}
