//! Client redirect/referrer URI repository

use super::{count_rows, delete_row, find_row, list_rows, EntityStore, Table};
use crate::domain::{ClientUri, EntityId};
use crate::error::{conflict_on_duplicate, AppError, Result};
use crate::query::{Criteria, Field, PageRequest};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[async_trait]
pub trait ClientUriRepository: EntityStore<ClientUri> {
    async fn create(&self, uri: &ClientUri) -> Result<ClientUri>;
    /// Writes the uri
    async fn update(&self, uri: &ClientUri) -> Result<ClientUri>;
    async fn delete(&self, id: EntityId) -> Result<()>;
}

fn columns(field: Field) -> Option<&'static str> {
    match field {
        Field::Id => Some("u.id"),
        Field::Owner => Some("a.owner_id"),
        Field::Application => Some("c.application_id"),
        Field::Client => Some("u.client_id"),
        Field::Type => Some("u.kind"),
        Field::CreatedDate => Some("u.created_date"),
        Field::ModifiedDate => Some("u.modified_date"),
        _ => None,
    }
}

const TABLE: Table = Table {
    select: "u.id, u.client_id, u.kind, u.uri, c.application_id, a.owner_id, \
             u.created_date, u.modified_date",
    from: "client_uris u \
           JOIN clients c ON c.id = u.client_id \
           JOIN applications a ON a.id = c.application_id",
    columns,
};

const DUPLICATE: &str = "This URI is already registered for the client";

pub struct ClientUriRepositoryImpl {
    pool: MySqlPool,
}

impl ClientUriRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn reload(&self, id: EntityId) -> Result<ClientUri> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Client URI {} not found", id)))
    }
}

#[async_trait]
impl EntityStore<ClientUri> for ClientUriRepositoryImpl {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<ClientUri>> {
        find_row(&self.pool, &TABLE, id).await
    }

    async fn count(&self, criteria: &Criteria) -> Result<i64> {
        count_rows(&self.pool, &TABLE, criteria).await
    }

    async fn list(&self, criteria: &Criteria, page: &PageRequest) -> Result<Vec<ClientUri>> {
        list_rows(&self.pool, &TABLE, criteria, page).await
    }
}

#[async_trait]
impl ClientUriRepository for ClientUriRepositoryImpl {
    async fn create(&self, uri: &ClientUri) -> Result<ClientUri> {
        sqlx::query(
            r#"
            INSERT INTO client_uris (id, client_id, kind, uri, created_date, modified_date)
            VALUES (?, ?, ?, ?, NOW(6), NOW(6))
            "#,
        )
        .bind(uri.id)
        .bind(uri.client_id)
        .bind(uri.kind)
        .bind(&uri.uri)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, DUPLICATE))?;

        self.reload(uri.id).await
    }

    async fn update(&self, uri: &ClientUri) -> Result<ClientUri> {
        let result =
            sqlx::query("UPDATE client_uris SET uri = ?, modified_date = NOW(6) WHERE id = ?")
                .bind(&uri.uri)
                .bind(uri.id)
                .execute(&self.pool)
                .await
                .map_err(|e| conflict_on_duplicate(e, DUPLICATE))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Client URI {} not found", uri.id)));
        }
        self.reload(uri.id).await
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        if !delete_row(&self.pool, "client_uris", id).await? {
            return Err(AppError::NotFound(format!("Client URI {} not found", id)));
        }
        Ok(())
    }
}
