use sqlx::PgPool;
use uuid::Uuid;

use crate::models::service_type::ServiceType;
use crate::utils::errors::{map_unique_violation, AppError};

pub struct ServiceTypeRepository {
    pool: PgPool,
}

impl ServiceTypeRepository {
    pub const TABLE: &'static str = "service_types";

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, service_type: &ServiceType) -> Result<ServiceType, AppError> {
        let created = sqlx::query_as::<_, ServiceType>(
            r#"
            INSERT INTO service_types (
                id, name, description, estimated_duration_minutes, price, is_active,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(service_type.id)
        .bind(&service_type.name)
        .bind(&service_type.description)
        .bind(service_type.estimated_duration_minutes)
        .bind(service_type.price)
        .bind(service_type.is_active)
        .bind(service_type.audit.is_deleted)
        .bind(service_type.audit.created_at)
        .bind(service_type.audit.created_by)
        .bind(service_type.audit.updated_at)
        .bind(service_type.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Service type '{}' already exists", service_type.name)))?;
        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ServiceType>, AppError> {
        let found = sqlx::query_as::<_, ServiceType>("SELECT * FROM service_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    /// Live and active service types among `ids`.
    pub async fn find_bookable(&self, ids: &[Uuid]) -> Result<Vec<ServiceType>, AppError> {
        let found = sqlx::query_as::<_, ServiceType>(
            "SELECT * FROM service_types WHERE id = ANY($1) AND is_active AND NOT is_deleted",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(found)
    }

    pub async fn update(&self, service_type: &ServiceType) -> Result<ServiceType, AppError> {
        let updated = sqlx::query_as::<_, ServiceType>(
            r#"
            UPDATE service_types
            SET name = $2, description = $3, estimated_duration_minutes = $4, price = $5,
                is_active = $6, updated_at = NOW(), updated_by = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(service_type.id)
        .bind(&service_type.name)
        .bind(&service_type.description)
        .bind(service_type.estimated_duration_minutes)
        .bind(service_type.price)
        .bind(service_type.is_active)
        .bind(service_type.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Service type '{}' already exists", service_type.name)))?;
        Ok(updated)
    }

    pub async fn search(
        &self,
        pattern: Option<&str>,
        include_deleted: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ServiceType>, i64), AppError> {
        let items = sqlx::query_as::<_, ServiceType>(
            r#"
            SELECT * FROM service_types
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
            SELECT COUNT(*) FROM service_types
            WHERE ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1)
              AND ($2 OR NOT is_deleted)
            "#,
        )
        .bind(pattern)
        .bind(include_deleted)
        .fetch_one(&self.pool)
        .await?;

        Ok((items, total))
    }

    pub async fn soft_delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::soft_delete(&self.pool, Self::TABLE, id, actor).await
    }

    pub async fn restore(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::restore(&self.pool, Self::TABLE, id, actor).await
    }
}
