//! OAuth2 token repository

use super::{count_rows, delete_row, find_row, list_rows, EntityStore, Table};
use crate::domain::{EntityId, OAuthToken};
use crate::error::{AppError, Result};
use crate::query::{Criteria, Field, PageRequest};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};

#[async_trait]
pub trait TokenRepository: EntityStore<OAuthToken> {
    /// Inserts the token and grants the given scopes
    async fn create(&self, token: &OAuthToken, scope_ids: &[EntityId]) -> Result<OAuthToken>;
    async fn delete(&self, id: EntityId) -> Result<()>;
}

fn columns(field: Field) -> Option<&'static str> {
    match field {
        Field::Id => Some("t.id"),
        Field::Owner => Some("a.owner_id"),
        Field::Application => Some("c.application_id"),
        Field::Client => Some("t.client_id"),
        Field::Identity => Some("t.identity_id"),
        Field::User => Some("i.user_id"),
        Field::Type => Some("t.token_type"),
        Field::ClientName => Some("c.name"),
        Field::IssuedAt => Some("t.issued_at"),
        Field::CreatedDate => Some("t.created_date"),
        Field::ModifiedDate => Some("t.modified_date"),
        _ => None,
    }
}

const TABLE: Table = Table {
    select: "t.id, t.client_id, t.identity_id, t.token_type, t.expires_in, t.issued_at, \
             t.redirect, c.application_id, a.owner_id, i.user_id, c.name AS client_name, \
             t.created_date, t.modified_date",
    from: "oauth_tokens t \
           JOIN clients c ON c.id = t.client_id \
           JOIN applications a ON a.id = c.application_id \
           LEFT JOIN user_identities i ON i.id = t.identity_id",
    columns,
};

pub struct TokenRepositoryImpl {
    pool: MySqlPool,
}

impl TokenRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn attach_scopes(&self, tokens: &mut [OAuthToken]) -> Result<()> {
        if tokens.is_empty() {
            return Ok(());
        }

        let mut qb: QueryBuilder<MySql> = QueryBuilder::new(
            "SELECT ts.token_id, s.name FROM token_scopes ts \
             JOIN application_scopes s ON s.id = ts.scope_id \
             WHERE ts.token_id IN (",
        );
        let mut ids = qb.separated(", ");
        for token in tokens.iter() {
            ids.push_bind(token.id);
        }
        ids.push_unseparated(")");
        qb.push(" ORDER BY s.name");

        let grants: Vec<(EntityId, String)> = qb.build_query_as().fetch_all(&self.pool).await?;
        for token in tokens.iter_mut() {
            token.scopes = grants
                .iter()
                .filter(|(token_id, _)| *token_id == token.id)
                .map(|(_, name)| name.clone())
                .collect();
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore<OAuthToken> for TokenRepositoryImpl {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<OAuthToken>> {
        let mut token: Option<OAuthToken> = find_row(&self.pool, &TABLE, id).await?;
        if let Some(token) = token.as_mut() {
            self.attach_scopes(std::slice::from_mut(token)).await?;
        }
        Ok(token)
    }

    async fn count(&self, criteria: &Criteria) -> Result<i64> {
        count_rows(&self.pool, &TABLE, criteria).await
    }

    async fn list(&self, criteria: &Criteria, page: &PageRequest) -> Result<Vec<OAuthToken>> {
        let mut tokens: Vec<OAuthToken> = list_rows(&self.pool, &TABLE, criteria, page).await?;
        self.attach_scopes(&mut tokens).await?;
        Ok(tokens)
    }
}

#[async_trait]
impl TokenRepository for TokenRepositoryImpl {
    async fn create(&self, token: &OAuthToken, scope_ids: &[EntityId]) -> Result<OAuthToken> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO oauth_tokens
                (id, client_id, identity_id, token_type, expires_in, issued_at, redirect, created_date, modified_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, NOW(6), NOW(6))
            "#,
        )
        .bind(token.id)
        .bind(token.client_id)
        .bind(token.identity_id)
        .bind(token.token_type)
        .bind(token.expires_in)
        .bind(token.issued_at)
        .bind(&token.redirect)
        .execute(&mut *tx)
        .await?;

        for scope_id in scope_ids {
            sqlx::query("INSERT IGNORE INTO token_scopes (token_id, scope_id) VALUES (?, ?)")
                .bind(token.id)
                .bind(*scope_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.find_by_id(token.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create token")))
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        if !delete_row(&self.pool, "oauth_tokens", id).await? {
            return Err(AppError::NotFound(format!("Token {} not found", id)));
        }
        Ok(())
    }
}
