//! Application scope repository

use super::{count_rows, delete_row, find_row, list_rows, EntityStore, Table};
use crate::domain::{ApplicationScope, EntityId};
use crate::error::{conflict_on_duplicate, AppError, Result};
use crate::query::{Criteria, Field, PageRequest};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[async_trait]
pub trait ScopeRepository: EntityStore<ApplicationScope> {
    async fn create(&self, scope: &ApplicationScope) -> Result<ApplicationScope>;
    /// Writes the name
    async fn update(&self, scope: &ApplicationScope) -> Result<ApplicationScope>;
    async fn delete(&self, id: EntityId) -> Result<()>;
}

fn columns(field: Field) -> Option<&'static str> {
    match field {
        Field::Id => Some("s.id"),
        Field::Owner => Some("a.owner_id"),
        Field::Application => Some("s.application_id"),
        Field::Name => Some("s.name"),
        Field::CreatedDate => Some("s.created_date"),
        Field::ModifiedDate => Some("s.modified_date"),
        _ => None,
    }
}

const TABLE: Table = Table {
    select: "s.id, s.application_id, s.name, a.owner_id, s.created_date, s.modified_date",
    from: "application_scopes s JOIN applications a ON a.id = s.application_id",
    columns,
};

const DUPLICATE: &str = "A scope with this name already exists in the application";

pub struct ScopeRepositoryImpl {
    pool: MySqlPool,
}

impl ScopeRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn reload(&self, id: EntityId) -> Result<ApplicationScope> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Scope {} not found", id)))
    }
}

#[async_trait]
impl EntityStore<ApplicationScope> for ScopeRepositoryImpl {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<ApplicationScope>> {
        find_row(&self.pool, &TABLE, id).await
    }

    async fn count(&self, criteria: &Criteria) -> Result<i64> {
        count_rows(&self.pool, &TABLE, criteria).await
    }

    async fn list(
        &self,
        criteria: &Criteria,
        page: &PageRequest,
    ) -> Result<Vec<ApplicationScope>> {
        list_rows(&self.pool, &TABLE, criteria, page).await
    }
}

#[async_trait]
impl ScopeRepository for ScopeRepositoryImpl {
    async fn create(&self, scope: &ApplicationScope) -> Result<ApplicationScope> {
        sqlx::query(
            r#"
            INSERT INTO application_scopes (id, application_id, name, created_date, modified_date)
            VALUES (?, ?, ?, NOW(6), NOW(6))
            "#,
        )
        .bind(scope.id)
        .bind(scope.application_id)
        .bind(&scope.name)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, DUPLICATE))?;

        self.reload(scope.id).await
    }

    async fn update(&self, scope: &ApplicationScope) -> Result<ApplicationScope> {
        let result = sqlx::query(
            "UPDATE application_scopes SET name = ?, modified_date = NOW(6) WHERE id = ?",
        )
        .bind(&scope.name)
        .bind(scope.id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, DUPLICATE))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Scope {} not found", scope.id)));
        }
        self.reload(scope.id).await
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        if !delete_row(&self.pool, "application_scopes", id).await? {
            return Err(AppError::NotFound(format!("Scope {} not found", id)));
        }
        Ok(())
    }
}
