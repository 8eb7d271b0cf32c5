//! Browse and search orchestration
//!
//! A listing runs two store calls with one [`Criteria`]: the count for the
//! `Total` header and the requested window. Paging metadata travels in
//! headers, the body is a bare JSON array.

use crate::error::Result;
use crate::query::{Criteria, PageRequest};
use crate::repository::EntityStore;
use axum::{
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const OFFSET_HEADER: &str = "offset";
pub const LIMIT_HEADER: &str = "limit";
pub const TOTAL_HEADER: &str = "total";

/// One window of a listing plus the size of the full result set
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub offset: i64,
    pub limit: i64,
    pub total: i64,
}

/// Count and fetch one page under the same criteria
pub async fn browse<T, R>(store: &R, criteria: Criteria, page: PageRequest) -> Result<ListPage<T>>
where
    R: EntityStore<T> + ?Sized,
{
    let total = store.count(&criteria).await?;
    let items = if total > page.offset {
        store.list(&criteria, &page).await?
    } else {
        Vec::new()
    };

    Ok(ListPage {
        items,
        offset: page.offset,
        limit: page.limit,
        total,
    })
}

/// HTTP rendering of a [`ListPage`]
#[derive(Debug)]
pub struct ListResponse<T>(ListPage<T>);

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>, offset: i64, limit: i64, total: i64) -> Self {
        Self(ListPage {
            items,
            offset,
            limit,
            total,
        })
    }
}

impl<T> From<ListPage<T>> for ListResponse<T> {
    fn from(page: ListPage<T>) -> Self {
        Self(page)
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        let ListPage {
            items,
            offset,
            limit,
            total,
        } = self.0;

        let mut response = Json(items).into_response();
        let headers = response.headers_mut();
        for (name, value) in [
            (OFFSET_HEADER, offset),
            (LIMIT_HEADER, limit),
            (TOTAL_HEADER, total),
        ] {
            headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
        }
        response
    }
}
