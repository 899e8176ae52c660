use sqlx::PgPool;
use uuid::Uuid;

use crate::models::role::Role;
use crate::utils::errors::{map_unique_violation, AppError};

pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub const TABLE: &'static str = "roles";

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, role: &Role) -> Result<Role, AppError> {
        sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (id, name, description, is_deleted, created_at, created_by, updated_at, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.audit.is_deleted)
        .bind(role.audit.created_at)
        .bind(role.audit.created_by)
        .bind(role.audit.updated_at)
        .bind(role.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Role '{}' already exists", role.name)))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = $1 AND NOT is_deleted")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    /// Live roles among `ids`; callers compare lengths to detect unknown ids.
    pub async fn find_live_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = ANY($1) AND NOT is_deleted")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    pub async fn update(&self, role: &Role) -> Result<Role, AppError> {
        sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET name = $2, description = $3, updated_at = NOW(), updated_by = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Role '{}' already exists", role.name)))
    }

    pub async fn search(
        &self,
        pattern: Option<&str>,
        include_deleted: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Role>, i64), AppError> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1)
              AND ($2 OR NOT is_deleted)
            ORDER BY name
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(pattern)
        .bind(include_deleted)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM roles
            WHERE ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1)
              AND ($2 OR NOT is_deleted)
            "#,
        )
        .bind(pattern)
        .bind(include_deleted)
        .fetch_one(&self.pool)
        .await?;

        Ok((roles, total))
    }

    pub async fn soft_delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::soft_delete(&self.pool, Self::TABLE, id, actor).await
    }

    pub async fn restore(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::restore(&self.pool, Self::TABLE, id, actor).await
    }
}
