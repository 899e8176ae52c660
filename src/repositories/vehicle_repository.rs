use sqlx::PgPool;
use uuid::Uuid;

use crate::models::vehicle::Vehicle;
use crate::utils::errors::{map_unique_violation, AppError};

pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub const TABLE: &'static str = "vehicles";

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, vehicle: &Vehicle) -> Result<Vehicle, AppError> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (
                id, vin, license_plate, vehicle_type_id, customer_id, mileage_km, purchase_date,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(vehicle.id)
        .bind(&vehicle.vin)
        .bind(&vehicle.license_plate)
        .bind(vehicle.vehicle_type_id)
        .bind(vehicle.customer_id)
        .bind(vehicle.mileage_km)
        .bind(vehicle.purchase_date)
        .bind(vehicle.audit.is_deleted)
        .bind(vehicle.audit.created_at)
        .bind(vehicle.audit.created_by)
        .bind(vehicle.audit.updated_at)
        .bind(vehicle.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("VIN '{}' is already registered", vehicle.vin)))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Vehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vehicle)
    }

    pub async fn update(&self, vehicle: &Vehicle) -> Result<Vehicle, AppError> {
        let updated = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET license_plate = $2, vehicle_type_id = $3, mileage_km = $4, purchase_date = $5,
                updated_at = NOW(), updated_by = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(vehicle.id)
        .bind(&vehicle.license_plate)
        .bind(vehicle.vehicle_type_id)
        .bind(vehicle.mileage_km)
        .bind(vehicle.purchase_date)
        .bind(vehicle.audit.updated_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    /// `customer_id` narrows the search to one owner.
    pub async fn search(
        &self,
        pattern: Option<&str>,
        customer_id: Option<Uuid>,
        include_deleted: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Vehicle>, i64), AppError> {
        let items = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT * FROM vehicles
            WHERE ($1::text IS NULL OR vin ILIKE $1 OR license_plate ILIKE $1)
              AND ($2::uuid IS NULL OR customer_id = $2)
              AND ($3 OR NOT is_deleted)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(pattern)
        .bind(customer_id)
        .bind(include_deleted)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM vehicles
            WHERE ($1::text IS NULL OR vin ILIKE $1 OR license_plate ILIKE $1)
              AND ($2::uuid IS NULL OR customer_id = $2)
              AND ($3 OR NOT is_deleted)
            "#,
        )
        .bind(pattern)
        .bind(customer_id)
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
