//! User identity repository

use super::{count_rows, delete_row, find_row, list_rows, EntityStore, Table};
use crate::domain::{EntityId, UserIdentity};
use crate::error::{conflict_on_duplicate, AppError, Result};
use crate::query::{Criteria, Field, PageRequest};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::MySqlPool;

#[async_trait]
pub trait IdentityRepository: EntityStore<UserIdentity> {
    async fn create(&self, identity: &UserIdentity) -> Result<UserIdentity>;
    /// Writes remote id, claims and password hash
    async fn update(&self, identity: &UserIdentity) -> Result<UserIdentity>;
    async fn delete(&self, id: EntityId) -> Result<()>;
}

fn columns(field: Field) -> Option<&'static str> {
    match field {
        Field::Id => Some("i.id"),
        Field::Owner => Some("a.owner_id"),
        Field::Application => Some("u.application_id"),
        Field::User => Some("i.user_id"),
        Field::Type => Some("i.identity_type"),
        Field::RemoteId => Some("i.remote_id"),
        Field::CreatedDate => Some("i.created_date"),
        Field::ModifiedDate => Some("i.modified_date"),
        _ => None,
    }
}

const TABLE: Table = Table {
    select: "i.id, i.user_id, i.identity_type, i.remote_id, i.claims, i.password_hash, \
             u.application_id, a.owner_id, i.created_date, i.modified_date",
    from: "user_identities i \
           JOIN users u ON u.id = i.user_id \
           JOIN applications a ON a.id = u.application_id",
    columns,
};

const DUPLICATE: &str = "This identity is already registered";

pub struct IdentityRepositoryImpl {
    pool: MySqlPool,
}

impl IdentityRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn reload(&self, id: EntityId) -> Result<UserIdentity> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Identity {} not found", id)))
    }
}

#[async_trait]
impl EntityStore<UserIdentity> for IdentityRepositoryImpl {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<UserIdentity>> {
        find_row(&self.pool, &TABLE, id).await
    }

    async fn count(&self, criteria: &Criteria) -> Result<i64> {
        count_rows(&self.pool, &TABLE, criteria).await
    }

    async fn list(&self, criteria: &Criteria, page: &PageRequest) -> Result<Vec<UserIdentity>> {
        list_rows(&self.pool, &TABLE, criteria, page).await
    }
}

#[async_trait]
impl IdentityRepository for IdentityRepositoryImpl {
    async fn create(&self, identity: &UserIdentity) -> Result<UserIdentity> {
        sqlx::query(
            r#"
            INSERT INTO user_identities
                (id, user_id, identity_type, remote_id, claims, password_hash, created_date, modified_date)
            VALUES (?, ?, ?, ?, ?, ?, NOW(6), NOW(6))
            "#,
        )
        .bind(identity.id)
        .bind(identity.user_id)
        .bind(identity.identity_type)
        .bind(&identity.remote_id)
        .bind(Json(&identity.claims))
        .bind(&identity.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, DUPLICATE))?;

        self.reload(identity.id).await
    }

    async fn update(&self, identity: &UserIdentity) -> Result<UserIdentity> {
        let result = sqlx::query(
            r#"
            UPDATE user_identities
            SET remote_id = ?, claims = ?, password_hash = ?, modified_date = NOW(6)
            WHERE id = ?
            "#,
        )
        .bind(&identity.remote_id)
        .bind(Json(&identity.claims))
        .bind(&identity.password_hash)
        .bind(identity.id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, DUPLICATE))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Identity {} not found",
                identity.id
            )));
        }
        self.reload(identity.id).await
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        if !delete_row(&self.pool, "user_identities", id).await? {
            return Err(AppError::NotFound(format!("Identity {} not found", id)));
        }
        Ok(())
    }
}
