//! Data access layer (Repository pattern)
//!
//! Each entity kind has a repository trait extending [`EntityStore`], which
//! provides the lookups the access control and listing code needs. The MySQL
//! implementations share one query path: [`count_rows`] and [`list_rows`]
//! render the same [`Criteria`] through [`Criteria::push_where`], so a page
//! and its total can never disagree.

pub mod application;
pub mod client;
pub mod client_uri;
pub mod identity;
pub mod role;
pub mod scope;
pub mod token;
pub mod user;

pub use application::{ApplicationRepository, ApplicationRepositoryImpl};
pub use client::{ClientRepository, ClientRepositoryImpl};
pub use client_uri::{ClientUriRepository, ClientUriRepositoryImpl};
pub use identity::{IdentityRepository, IdentityRepositoryImpl};
pub use role::{RoleRepository, RoleRepositoryImpl};
pub use scope::{ScopeRepository, ScopeRepositoryImpl};
pub use token::{TokenRepository, TokenRepositoryImpl};
pub use user::{UserRepository, UserRepositoryImpl};

use crate::domain::EntityId;
use crate::error::Result;
use crate::query::{ColumnMap, Criteria, Field, PageRequest};
use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};

/// Deleting an application owner would leave its applications ownerless
pub const OWNS_APPLICATIONS: &str = "The user still owns applications; reassign them first";

/// Read access shared by every entity kind
#[async_trait]
pub trait EntityStore<T>: Send + Sync {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<T>>;

    /// Number of entities matching the criteria
    async fn count(&self, criteria: &Criteria) -> Result<i64>;

    /// One window of the entities matching the criteria
    async fn list(&self, criteria: &Criteria, page: &PageRequest) -> Result<Vec<T>>;
}

/// How an entity kind is read: its projection, its joined source tables and
/// the mapping from logical fields to columns.
pub(crate) struct Table {
    pub select: &'static str,
    pub from: &'static str,
    pub columns: ColumnMap,
}

pub(crate) async fn find_row<T>(pool: &MySqlPool, table: &Table, id: EntityId) -> Result<Option<T>>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    let criteria = Criteria::new().equals(Field::Id, id);
    let mut qb: QueryBuilder<MySql> =
        QueryBuilder::new(format!("SELECT {} FROM {}", table.select, table.from));
    criteria.push_where(&mut qb, table.columns)?;
    let row = qb.build_query_as::<T>().fetch_optional(pool).await?;
    Ok(row)
}

pub(crate) async fn count_rows(pool: &MySqlPool, table: &Table, criteria: &Criteria) -> Result<i64> {
    let mut qb: QueryBuilder<MySql> = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", table.from));
    criteria.push_where(&mut qb, table.columns)?;
    let (count,): (i64,) = qb.build_query_as().fetch_one(pool).await?;
    Ok(count)
}

pub(crate) async fn list_rows<T>(
    pool: &MySqlPool,
    table: &Table,
    criteria: &Criteria,
    page: &PageRequest,
) -> Result<Vec<T>>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    let mut qb: QueryBuilder<MySql> =
        QueryBuilder::new(format!("SELECT {} FROM {}", table.select, table.from));
    criteria.push_where(&mut qb, table.columns)?;
    page.push_order_and_window(&mut qb, table.columns)?;
    let rows = qb.build_query_as::<T>().fetch_all(pool).await?;
    Ok(rows)
}

/// Delete one row by id, reporting whether it existed
pub(crate) async fn delete_row(pool: &MySqlPool, table: &'static str, id: EntityId) -> Result<bool> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
