//! Client redirect and referrer URI handlers
//!
//! Mounted at `/client/{id}/{kind}` where `kind` is `redirect` or `referrer`.
//! The parent client is checked as a subresource: a client the caller cannot
//! see makes the request malformed rather than not found.

use crate::api::listing::{self, ListResponse};
use crate::api::{created, path_param, raw_path_params, PageParams, ValidJson, API_PREFIX};
use crate::domain::{ensure_unchanged, Client, ClientUri, ClientUriInput, ClientUriKind, EntityId};
use crate::error::{AppError, Result};
use crate::middleware::auth::Principal;
use crate::policy::{AccessControl, ResourceKind};
use crate::query::{Criteria, Field};
use crate::repository::{ClientUriRepository, EntityStore};
use crate::state::HasRepositories;
use axum::{
    extract::{FromRequestParts, Query, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

const SORTS: &[Field] = &[Field::CreatedDate, Field::ModifiedDate, Field::Id];

/// `/client/{id}/{kind}`
#[derive(Debug, Clone, Copy)]
pub struct UriListPath {
    pub client_id: EntityId,
    pub kind: ClientUriKind,
}

/// `/client/{id}/{kind}/{uri_id}`
#[derive(Debug, Clone, Copy)]
pub struct UriPath {
    pub client_id: EntityId,
    pub kind: ClientUriKind,
    pub uri_id: EntityId,
}

impl<S: Send + Sync> FromRequestParts<S> for UriListPath {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let params = raw_path_params(parts, state).await?;
        Ok(Self {
            client_id: path_param(&params, "id")?,
            kind: path_param(&params, "kind")?,
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for UriPath {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let params = raw_path_params(parts, state).await?;
        Ok(Self {
            client_id: path_param(&params, "id")?,
            kind: path_param(&params, "kind")?,
            uri_id: path_param(&params, "uri_id")?,
        })
    }
}

fn access(principal: &Principal) -> Result<AccessControl<'_>> {
    let ac = AccessControl::new(principal, ResourceKind::Client);
    ac.require_scope()?;
    Ok(ac)
}

async fn load_client<S: HasRepositories>(
    state: &S,
    ac: &AccessControl<'_>,
    client_id: EntityId,
) -> Result<Client> {
    let client = state.client_repo().find_by_id(client_id).await?;
    ac.assert_can_access_subresource(client, ac.policy().admin)
}

async fn load_uri<S: HasRepositories>(state: &S, client: &Client, path: &UriPath) -> Result<ClientUri> {
    state
        .client_uri_repo()
        .find_by_id(path.uri_id)
        .await?
        .filter(|uri| uri.client_id == client.id && uri.kind == path.kind)
        .ok_or_else(|| AppError::NotFound("Client URI not found".to_string()))
}

fn location(uri: &ClientUri) -> String {
    format!(
        "{}/client/{}/{}/{}",
        API_PREFIX, uri.client_id, uri.kind, uri.id
    )
}

/// List the URIs of one kind registered on a client
pub async fn list<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    path: UriListPath,
    Query(page): Query<PageParams>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let client = load_client(&state, &ac, path.client_id).await?;

    let criteria = Criteria::new()
        .equals(Field::Client, client.id)
        .equals(Field::Type, path.kind);
    let page = listing::browse(state.client_uri_repo(), criteria, page.page_request(SORTS)).await?;
    Ok(ListResponse::from(page))
}

/// Get one URI of a client
pub async fn get<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    path: UriPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let client = load_client(&state, &ac, path.client_id).await?;
    Ok(Json(load_uri(&state, &client, &path).await?))
}

/// Register a URI on a client
pub async fn create<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    path: UriListPath,
    ValidJson(input): ValidJson<ClientUriInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let client = load_client(&state, &ac, path.client_id).await?;
    state.admin_app().assert_mutable(client.application_id)?;
    ensure_unchanged("client_id", Some(&client.id), input.client_id.as_ref())?;

    let now = Utc::now();
    let uri = state
        .client_uri_repo()
        .create(&ClientUri {
            id: EntityId::new_v4(),
            client_id: client.id,
            kind: path.kind,
            uri: input.uri,
            application_id: client.application_id,
            owner_id: client.owner_id,
            created_date: now,
            modified_date: now,
        })
        .await?;

    Ok(created(location(&uri), uri))
}

/// Replace the address of a registered URI
pub async fn update<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    path: UriPath,
    ValidJson(input): ValidJson<ClientUriInput>,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let client = load_client(&state, &ac, path.client_id).await?;
    state.admin_app().assert_mutable(client.application_id)?;
    let current = load_uri(&state, &client, &path).await?;
    ensure_unchanged("id", Some(&current.id), input.id.as_ref())?;
    ensure_unchanged("client_id", Some(&current.client_id), input.client_id.as_ref())?;

    let uri = state
        .client_uri_repo()
        .update(&ClientUri {
            uri: input.uri,
            ..current
        })
        .await?;
    Ok(Json(uri))
}

/// Remove a registered URI
pub async fn delete<S: HasRepositories>(
    State(state): State<S>,
    principal: Principal,
    path: UriPath,
) -> Result<impl IntoResponse> {
    let ac = access(&principal)?;
    let client = load_client(&state, &ac, path.client_id).await?;
    state.admin_app().assert_mutable(client.application_id)?;
    let current = load_uri(&state, &client, &path).await?;

    state.client_uri_repo().delete(current.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
