//! Client repository

use super::{count_rows, delete_row, find_row, list_rows, EntityStore, Table};
use crate::domain::{Client, EntityId};
use crate::error::{conflict_on_duplicate, AppError, Result};
use crate::query::{Criteria, Field, PageRequest};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[async_trait]
pub trait ClientRepository: EntityStore<Client> {
    async fn create(&self, client: &Client) -> Result<Client>;
    /// Writes the name
    async fn update(&self, client: &Client) -> Result<Client>;
    async fn delete(&self, id: EntityId) -> Result<()>;
}

fn columns(field: Field) -> Option<&'static str> {
    match field {
        Field::Id => Some("c.id"),
        Field::Owner => Some("a.owner_id"),
        Field::Application => Some("c.application_id"),
        Field::Name => Some("c.name"),
        Field::Type => Some("c.client_type"),
        Field::CreatedDate => Some("c.created_date"),
        Field::ModifiedDate => Some("c.modified_date"),
        _ => None,
    }
}

const TABLE: Table = Table {
    select: "c.id, c.application_id, c.name, c.client_type, c.client_secret, a.owner_id, \
             c.created_date, c.modified_date",
    from: "clients c JOIN applications a ON a.id = c.application_id",
    columns,
};

pub struct ClientRepositoryImpl {
    pool: MySqlPool,
}

impl ClientRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn reload(&self, id: EntityId) -> Result<Client> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Client {} not found", id)))
    }
}

#[async_trait]
impl EntityStore<Client> for ClientRepositoryImpl {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<Client>> {
        find_row(&self.pool, &TABLE, id).await
    }

    async fn count(&self, criteria: &Criteria) -> Result<i64> {
        count_rows(&self.pool, &TABLE, criteria).await
    }

    async fn list(&self, criteria: &Criteria, page: &PageRequest) -> Result<Vec<Client>> {
        list_rows(&self.pool, &TABLE, criteria, page).await
    }
}

#[async_trait]
impl ClientRepository for ClientRepositoryImpl {
    async fn create(&self, client: &Client) -> Result<Client> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, application_id, name, client_type, client_secret, created_date, modified_date)
            VALUES (?, ?, ?, ?, ?, NOW(6), NOW(6))
            "#,
        )
        .bind(client.id)
        .bind(client.application_id)
        .bind(&client.name)
        .bind(client.client_type)
        .bind(&client.client_secret)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Client already exists"))?;

        self.reload(client.id).await
    }

    async fn update(&self, client: &Client) -> Result<Client> {
        let result = sqlx::query("UPDATE clients SET name = ?, modified_date = NOW(6) WHERE id = ?")
            .bind(&client.name)
            .bind(client.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Client {} not found", client.id)));
        }
        self.reload(client.id).await
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        if !delete_row(&self.pool, "clients", id).await? {
            return Err(AppError::NotFound(format!("Client {} not found", id)));
        }
        Ok(())
    }
}
