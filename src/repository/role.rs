//! Role repository

use super::{count_rows, delete_row, find_row, list_rows, EntityStore, Table};
use crate::domain::{EntityId, Role};
use crate::error::{conflict_on_duplicate, AppError, Result};
use crate::query::{Criteria, Field, PageRequest};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};

#[async_trait]
pub trait RoleRepository: EntityStore<Role> {
    /// Inserts the role together with its scope links
    async fn create(&self, role: &Role) -> Result<Role>;
    /// Writes the name
    async fn update(&self, role: &Role) -> Result<Role>;
    async fn delete(&self, id: EntityId) -> Result<()>;
    /// Link a scope; linking twice is a no-op
    async fn add_scope(&self, role_id: EntityId, scope_id: EntityId) -> Result<Role>;
    /// Unlink a scope, failing with `NotFound` when it was not linked
    async fn remove_scope(&self, role_id: EntityId, scope_id: EntityId) -> Result<Role>;
}

fn columns(field: Field) -> Option<&'static str> {
    match field {
        Field::Id => Some("r.id"),
        Field::Owner => Some("a.owner_id"),
        Field::Application => Some("r.application_id"),
        Field::Name => Some("r.name"),
        Field::CreatedDate => Some("r.created_date"),
        Field::ModifiedDate => Some("r.modified_date"),
        _ => None,
    }
}

const TABLE: Table = Table {
    select: "r.id, r.application_id, r.name, a.owner_id, r.created_date, r.modified_date",
    from: "roles r JOIN applications a ON a.id = r.application_id",
    columns,
};

const DUPLICATE: &str = "A role with this name already exists in the application";

pub struct RoleRepositoryImpl {
    pool: MySqlPool,
}

impl RoleRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn reload(&self, id: EntityId) -> Result<Role> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))
    }

    async fn attach_scopes(&self, roles: &mut [Role]) -> Result<()> {
        if roles.is_empty() {
            return Ok(());
        }

        let mut qb: QueryBuilder<MySql> =
            QueryBuilder::new("SELECT role_id, scope_id FROM role_scopes WHERE role_id IN (");
        let mut ids = qb.separated(", ");
        for role in roles.iter() {
            ids.push_bind(role.id);
        }
        ids.push_unseparated(")");
        qb.push(" ORDER BY scope_id");

        let links: Vec<(EntityId, EntityId)> = qb.build_query_as().fetch_all(&self.pool).await?;
        for role in roles.iter_mut() {
            role.scopes = links
                .iter()
                .filter(|(role_id, _)| *role_id == role.id)
                .map(|(_, scope_id)| *scope_id)
                .collect();
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore<Role> for RoleRepositoryImpl {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<Role>> {
        let mut role: Option<Role> = find_row(&self.pool, &TABLE, id).await?;
        if let Some(role) = role.as_mut() {
            self.attach_scopes(std::slice::from_mut(role)).await?;
        }
        Ok(role)
    }

    async fn count(&self, criteria: &Criteria) -> Result<i64> {
        count_rows(&self.pool, &TABLE, criteria).await
    }

    async fn list(&self, criteria: &Criteria, page: &PageRequest) -> Result<Vec<Role>> {
        let mut roles: Vec<Role> = list_rows(&self.pool, &TABLE, criteria, page).await?;
        self.attach_scopes(&mut roles).await?;
        Ok(roles)
    }
}

#[async_trait]
impl RoleRepository for RoleRepositoryImpl {
    async fn create(&self, role: &Role) -> Result<Role> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO roles (id, application_id, name, created_date, modified_date)
            VALUES (?, ?, ?, NOW(6), NOW(6))
            "#,
        )
        .bind(role.id)
        .bind(role.application_id)
        .bind(&role.name)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_duplicate(e, DUPLICATE))?;

        for scope_id in &role.scopes {
            sqlx::query("INSERT IGNORE INTO role_scopes (role_id, scope_id) VALUES (?, ?)")
                .bind(role.id)
                .bind(*scope_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.reload(role.id).await
    }

    async fn update(&self, role: &Role) -> Result<Role> {
        let result = sqlx::query("UPDATE roles SET name = ?, modified_date = NOW(6) WHERE id = ?")
            .bind(&role.name)
            .bind(role.id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_duplicate(e, DUPLICATE))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Role {} not found", role.id)));
        }
        self.reload(role.id).await
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        if !delete_row(&self.pool, "roles", id).await? {
            return Err(AppError::NotFound(format!("Role {} not found", id)));
        }
        Ok(())
    }

    async fn add_scope(&self, role_id: EntityId, scope_id: EntityId) -> Result<Role> {
        sqlx::query("INSERT IGNORE INTO role_scopes (role_id, scope_id) VALUES (?, ?)")
            .bind(role_id)
            .bind(scope_id)
            .execute(&self.pool)
            .await?;

        self.reload(role_id).await
    }

    async fn remove_scope(&self, role_id: EntityId, scope_id: EntityId) -> Result<Role> {
        let result = sqlx::query("DELETE FROM role_scopes WHERE role_id = ? AND scope_id = ?")
            .bind(role_id)
            .bind(scope_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Scope {} is not linked to role {}",
                scope_id, role_id
            )));
        }
        self.reload(role_id).await
    }
}
