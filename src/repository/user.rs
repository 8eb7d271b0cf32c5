//! User repository

use super::{count_rows, find_row, list_rows, EntityStore, Table, OWNS_APPLICATIONS};
use crate::domain::{EntityId, User};
use crate::error::{conflict_on_duplicate, AppError, Result};
use crate::query::{Criteria, Field, PageRequest};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[async_trait]
pub trait UserRepository: EntityStore<User> {
    async fn create(&self, user: &User) -> Result<User>;
    /// Writes role, name and email
    async fn update(&self, user: &User) -> Result<User>;
    async fn delete(&self, id: EntityId) -> Result<()>;
}

fn columns(field: Field) -> Option<&'static str> {
    match field {
        Field::Id => Some("u.id"),
        Field::Owner => Some("a.owner_id"),
        Field::Application => Some("u.application_id"),
        Field::Role => Some("u.role_id"),
        Field::Name => Some("u.name"),
        Field::Email => Some("u.email"),
        Field::CreatedDate => Some("u.created_date"),
        Field::ModifiedDate => Some("u.modified_date"),
        _ => None,
    }
}

const TABLE: Table = Table {
    select: "u.id, u.application_id, u.role_id, u.name, u.email, a.owner_id, \
             u.created_date, u.modified_date",
    from: "users u JOIN applications a ON a.id = u.application_id",
    columns,
};

pub struct UserRepositoryImpl {
    pool: MySqlPool,
}

impl UserRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn reload(&self, id: EntityId) -> Result<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }
}

#[async_trait]
impl EntityStore<User> for UserRepositoryImpl {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<User>> {
        find_row(&self.pool, &TABLE, id).await
    }

    async fn count(&self, criteria: &Criteria) -> Result<i64> {
        count_rows(&self.pool, &TABLE, criteria).await
    }

    async fn list(&self, criteria: &Criteria, page: &PageRequest) -> Result<Vec<User>> {
        list_rows(&self.pool, &TABLE, criteria, page).await
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn create(&self, user: &User) -> Result<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, application_id, role_id, name, email, created_date, modified_date)
            VALUES (?, ?, ?, ?, ?, NOW(6), NOW(6))
            "#,
        )
        .bind(user.id)
        .bind(user.application_id)
        .bind(user.role_id)
        .bind(&user.name)
        .bind(&user.email)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, "A user with this email already exists"))?;

        self.reload(user.id).await
    }

    async fn update(&self, user: &User) -> Result<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET role_id = ?, name = ?, email = ?, modified_date = NOW(6)
            WHERE id = ?
            "#,
        )
        .bind(user.role_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, "A user with this email already exists"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        }
        self.reload(user.id).await
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // applications.owner_id has no foreign key (it would be circular)
        let (owned,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM applications WHERE owner_id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if owned > 0 {
            return Err(AppError::Conflict(OWNS_APPLICATIONS.to_string()));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
