use sqlx::PgPool;
use uuid::Uuid;

use crate::models::vehicle_type::VehicleType;
use crate::utils::errors::{map_unique_violation, AppError};

pub struct VehicleTypeRepository {
    pool: PgPool,
}

impl VehicleTypeRepository {
    pub const TABLE: &'static str = "vehicle_types";

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, vehicle_type: &VehicleType) -> Result<VehicleType, AppError> {
        let created = sqlx::query_as::<_, VehicleType>(
            r#"
            INSERT INTO vehicle_types (
                id, model_name, manufacturer, model_year, battery_capacity_kwh,
                maintenance_interval_km, maintenance_interval_months, description,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(vehicle_type.id)
        .bind(&vehicle_type.model_name)
        .bind(&vehicle_type.manufacturer)
        .bind(vehicle_type.model_year)
        .bind(vehicle_type.battery_capacity_kwh)
        .bind(vehicle_type.maintenance_interval_km)
        .bind(vehicle_type.maintenance_interval_months)
        .bind(&vehicle_type.description)
        .bind(vehicle_type.audit.is_deleted)
        .bind(vehicle_type.audit.created_at)
        .bind(vehicle_type.audit.created_by)
        .bind(vehicle_type.audit.updated_at)
        .bind(vehicle_type.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Vehicle type '{}' already exists", vehicle_type.model_name)))?;
        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<VehicleType>, AppError> {
        let found = sqlx::query_as::<_, VehicleType>("SELECT * FROM vehicle_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    pub async fn update(&self, vehicle_type: &VehicleType) -> Result<VehicleType, AppError> {
        let updated = sqlx::query_as::<_, VehicleType>(
            r#"
            UPDATE vehicle_types
            SET model_name = $2, manufacturer = $3, model_year = $4, battery_capacity_kwh = $5,
                maintenance_interval_km = $6, maintenance_interval_months = $7, description = $8,
                updated_at = NOW(), updated_by = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(vehicle_type.id)
        .bind(&vehicle_type.model_name)
        .bind(&vehicle_type.manufacturer)
        .bind(vehicle_type.model_year)
        .bind(vehicle_type.battery_capacity_kwh)
        .bind(vehicle_type.maintenance_interval_km)
        .bind(vehicle_type.maintenance_interval_months)
        .bind(&vehicle_type.description)
        .bind(vehicle_type.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Vehicle type '{}' already exists", vehicle_type.model_name)))?;
        Ok(updated)
    }

    pub async fn search(
        &self,
        pattern: Option<&str>,
        include_deleted: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<VehicleType>, i64), AppError> {
        let items = sqlx::query_as::<_, VehicleType>(
            r#"
            SELECT * FROM vehicle_types
            WHERE ($1::text IS NULL OR model_name ILIKE $1 OR manufacturer ILIKE $1)
              AND ($2 OR NOT is_deleted)
            ORDER BY manufacturer, model_name
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
            SELECT COUNT(*) FROM vehicle_types
            WHERE ($1::text IS NULL OR model_name ILIKE $1 OR manufacturer ILIKE $1)
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
