//! REST API shared utilities: paging parameters, path and body extractors

pub mod application;
pub mod client;
pub mod client_uri;
pub mod health;
pub mod identity;
pub mod listing;
pub mod metrics;
pub mod role;
pub mod scope;
pub mod token;
pub mod user;

use crate::domain::EntityId;
use crate::error::{AppError, Result};
use crate::query::{Field, PageRequest, SearchQuery, SortOrder};
use axum::{
    extract::{FromRequest, FromRequestParts, RawPathParams, Request},
    http::{header::LOCATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Prefix every resource route is mounted under
pub const API_PREFIX: &str = "/v1";

/// Maximum allowed `limit` value
pub(crate) const MAX_LIMIT: i64 = 100;

pub(crate) const DEFAULT_LIMIT: i64 = 10;

/// Paging and sorting query parameters shared by browse and search
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageParams {
    #[serde(default, deserialize_with = "deserialize_offset")]
    pub offset: i64,
    #[serde(default = "default_limit", deserialize_with = "deserialize_limit")]
    pub limit: i64,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
            sort: None,
            order: None,
        }
    }
}

impl PageParams {
    pub fn page_request(&self, allowed_sorts: &[Field]) -> PageRequest {
        PageRequest::new(
            self.offset,
            self.limit,
            self.sort.as_deref(),
            SortOrder::parse(self.order.as_deref()),
            allowed_sorts,
        )
    }
}

pub(crate) fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Reject negative offsets
pub(crate) fn deserialize_offset<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    if value < 0 {
        return Err(serde::de::Error::custom(
            "offset must be a non-negative integer",
        ));
    }
    Ok(value)
}

/// Reject limit values less than 1, clamp to MAX_LIMIT
pub(crate) fn deserialize_limit<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    if value < 1 {
        return Err(serde::de::Error::custom(
            "limit must be a positive integer (>= 1)",
        ));
    }
    Ok(value.min(MAX_LIMIT))
}

/// Free-text search parameter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

impl SearchParams {
    pub fn query(&self) -> Result<SearchQuery> {
        SearchQuery::parse(self.q.as_deref().unwrap_or_default())
    }
}

/// Read a named path segment. Anything unparseable cannot name an existing
/// entity, so it answers 404.
pub(crate) fn path_param<T: FromStr>(params: &RawPathParams, name: &str) -> Result<T> {
    params
        .iter()
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| value.parse().ok())
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))
}

pub(crate) async fn raw_path_params<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
) -> Result<RawPathParams> {
    RawPathParams::from_request_parts(parts, state)
        .await
        .map_err(|_| AppError::NotFound("Not found".to_string()))
}

/// The `{id}` segment of an entity route
#[derive(Debug, Clone, Copy)]
pub struct EntityPath(pub EntityId);

impl<S> FromRequestParts<S> for EntityPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let params = raw_path_params(parts, state).await?;
        Ok(EntityPath(path_param(&params, "id")?))
    }
}

/// JSON request body that has passed `validator` checks.
///
/// Malformed bodies, including unparseable ids, answer 400.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(error = %rejection.body_text(), "Rejected request body");
            AppError::BadRequest("Malformed request body".to_string())
        })?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// 201 with a `Location` header pointing at the new entity
pub(crate) fn created<T: Serialize>(location: String, body: T) -> Response {
    (StatusCode::CREATED, [(LOCATION, location)], Json(body)).into_response()
}
