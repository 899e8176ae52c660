use sqlx::PgPool;
use uuid::Uuid;

use crate::models::vehicle_part_category::VehiclePartCategory;
use crate::utils::errors::{map_unique_violation, AppError};

pub struct VehiclePartCategoryRepository {
    pool: PgPool,
}

impl VehiclePartCategoryRepository {
    pub const TABLE: &'static str = "vehicle_part_categories";

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, category: &VehiclePartCategory) -> Result<VehiclePartCategory, AppError> {
        sqlx::query_as::<_, VehiclePartCategory>(
            r#"
            INSERT INTO vehicle_part_categories (
                id, name, description, is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.audit.is_deleted)
        .bind(category.audit.created_at)
        .bind(category.audit.created_by)
        .bind(category.audit.updated_at)
        .bind(category.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Category '{}' already exists", category.name)))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<VehiclePartCategory>, AppError> {
        let found = sqlx::query_as::<_, VehiclePartCategory>("SELECT * FROM vehicle_part_categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    pub async fn update(&self, category: &VehiclePartCategory) -> Result<VehiclePartCategory, AppError> {
        sqlx::query_as::<_, VehiclePartCategory>(
            r#"
            UPDATE vehicle_part_categories
            SET name = $2, description = $3, updated_at = NOW(), updated_by = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Category '{}' already exists", category.name)))
    }

    pub async fn search(
        &self,
        pattern: Option<&str>,
        include_deleted: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<VehiclePartCategory>, i64), AppError> {
        let items = sqlx::query_as::<_, VehiclePartCategory>(
            r#"
            SELECT * FROM vehicle_part_categories
            WHERE ($1::text IS NULL OR name ILIKE $1)
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
            SELECT COUNT(*) FROM vehicle_part_categories
            WHERE ($1::text IS NULL OR name ILIKE $1)
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
