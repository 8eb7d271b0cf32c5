//! Application repository

use super::{count_rows, find_row, list_rows, EntityStore, Table, OWNS_APPLICATIONS};
use crate::domain::{Application, EntityId};
use crate::error::{conflict_on_duplicate, AppError, Result};
use crate::query::{Criteria, Field, PageRequest};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[async_trait]
pub trait ApplicationRepository: EntityStore<Application> {
    async fn create(&self, application: &Application) -> Result<Application>;
    /// Writes name and description
    async fn update(&self, application: &Application) -> Result<Application>;
    async fn update_owner(&self, id: EntityId, owner_id: Option<EntityId>) -> Result<Application>;
    async fn delete(&self, id: EntityId) -> Result<()>;
}

fn columns(field: Field) -> Option<&'static str> {
    match field {
        Field::Id => Some("a.id"),
        Field::Owner => Some("a.owner_id"),
        Field::Name => Some("a.name"),
        Field::Description => Some("a.description"),
        Field::CreatedDate => Some("a.created_date"),
        Field::ModifiedDate => Some("a.modified_date"),
        _ => None,
    }
}

const TABLE: Table = Table {
    select: "a.id, a.name, a.description, a.owner_id, a.created_date, a.modified_date",
    from: "applications a",
    columns,
};

pub struct ApplicationRepositoryImpl {
    pool: MySqlPool,
}

impl ApplicationRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn reload(&self, id: EntityId) -> Result<Application> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Application {} not found", id)))
    }
}

#[async_trait]
impl EntityStore<Application> for ApplicationRepositoryImpl {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<Application>> {
        find_row(&self.pool, &TABLE, id).await
    }

    async fn count(&self, criteria: &Criteria) -> Result<i64> {
        count_rows(&self.pool, &TABLE, criteria).await
    }

    async fn list(&self, criteria: &Criteria, page: &PageRequest) -> Result<Vec<Application>> {
        list_rows(&self.pool, &TABLE, criteria, page).await
    }
}

#[async_trait]
impl ApplicationRepository for ApplicationRepositoryImpl {
    async fn create(&self, application: &Application) -> Result<Application> {
        sqlx::query(
            r#"
            INSERT INTO applications (id, name, description, owner_id, created_date, modified_date)
            VALUES (?, ?, ?, ?, NOW(6), NOW(6))
            "#,
        )
        .bind(application.id)
        .bind(&application.name)
        .bind(&application.description)
        .bind(application.owner_id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Application already exists"))?;

        self.reload(application.id).await
    }

    async fn update(&self, application: &Application) -> Result<Application> {
        let result = sqlx::query(
            r#"
            UPDATE applications
            SET name = ?, description = ?, modified_date = NOW(6)
            WHERE id = ?
            "#,
        )
        .bind(&application.name)
        .bind(&application.description)
        .bind(application.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Application {} not found",
                application.id
            )));
        }
        self.reload(application.id).await
    }

    async fn update_owner(&self, id: EntityId, owner_id: Option<EntityId>) -> Result<Application> {
        sqlx::query("UPDATE applications SET owner_id = ?, modified_date = NOW(6) WHERE id = ?")
            .bind(owner_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.reload(id).await
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Its users go with it, so none of them may own another application
        let (owned,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM applications a JOIN users u ON u.id = a.owner_id \
             WHERE u.application_id = ? AND a.id <> ?",
        )
        .bind(id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if owned > 0 {
            return Err(AppError::Conflict(OWNS_APPLICATIONS.to_string()));
        }

        let result = sqlx::query("DELETE FROM applications WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Application {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
