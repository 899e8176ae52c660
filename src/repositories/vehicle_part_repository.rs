use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::vehicle_part::VehiclePart;
use crate::utils::errors::{map_unique_violation, AppError};

pub struct VehiclePartRepository {
    pool: PgPool,
}

impl VehiclePartRepository {
    pub const TABLE: &'static str = "vehicle_parts";

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, part: &VehiclePart) -> Result<VehiclePart, AppError> {
        sqlx::query_as::<_, VehiclePart>(
            r#"
            INSERT INTO vehicle_parts (
                id, name, part_number, category_id, vehicle_type_id, current_quantity,
                minimum_stock_level, unit_price, last_restock_date,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(part.id)
        .bind(&part.name)
        .bind(&part.part_number)
        .bind(part.category_id)
        .bind(part.vehicle_type_id)
        .bind(part.current_quantity)
        .bind(part.minimum_stock_level)
        .bind(part.unit_price)
        .bind(part.last_restock_date)
        .bind(part.audit.is_deleted)
        .bind(part.audit.created_at)
        .bind(part.audit.created_by)
        .bind(part.audit.updated_at)
        .bind(part.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Part number '{}' already exists", part.part_number)))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<VehiclePart>, AppError> {
        let found = sqlx::query_as::<_, VehiclePart>("SELECT * FROM vehicle_parts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    /// Quantity is only changed through `restock` and `decrement_stock`.
    pub async fn update(&self, part: &VehiclePart) -> Result<VehiclePart, AppError> {
        sqlx::query_as::<_, VehiclePart>(
            r#"
            UPDATE vehicle_parts
            SET name = $2, part_number = $3, category_id = $4, vehicle_type_id = $5,
                minimum_stock_level = $6, unit_price = $7, updated_at = NOW(), updated_by = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(part.id)
        .bind(&part.name)
        .bind(&part.part_number)
        .bind(part.category_id)
        .bind(part.vehicle_type_id)
        .bind(part.minimum_stock_level)
        .bind(part.unit_price)
        .bind(part.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Part number '{}' already exists", part.part_number)))
    }

    pub async fn restock(&self, id: Uuid, quantity: i32, actor: Option<Uuid>) -> Result<Option<VehiclePart>, AppError> {
        let part = sqlx::query_as::<_, VehiclePart>(
            r#"
            UPDATE vehicle_parts
            SET current_quantity = current_quantity + $2, last_restock_date = NOW(),
                updated_at = NOW(), updated_by = $3
            WHERE id = $1 AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await?;
        Ok(part)
    }

    /// Takes `quantity` out of stock only if enough is on hand.
    ///
    /// Returns `false` when the row was left untouched.
    pub async fn decrement_stock(
        conn: &mut PgConnection,
        id: Uuid,
        quantity: i32,
        actor: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE vehicle_parts
            SET current_quantity = current_quantity - $2, updated_at = NOW(), updated_by = $3
            WHERE id = $1 AND NOT is_deleted AND current_quantity >= $2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(actor)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn low_stock(&self) -> Result<Vec<VehiclePart>, AppError> {
        let parts = sqlx::query_as::<_, VehiclePart>(
            r#"
            SELECT * FROM vehicle_parts
            WHERE NOT is_deleted AND current_quantity <= minimum_stock_level
            ORDER BY current_quantity, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(parts)
    }

    pub async fn search(
        &self,
        pattern: Option<&str>,
        category_id: Option<Uuid>,
        include_deleted: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<VehiclePart>, i64), AppError> {
        let items = sqlx::query_as::<_, VehiclePart>(
            r#"
            SELECT * FROM vehicle_parts
            WHERE ($1::text IS NULL OR name ILIKE $1 OR part_number ILIKE $1)
              AND ($2::uuid IS NULL OR category_id = $2)
              AND ($3 OR NOT is_deleted)
            ORDER BY name
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(pattern)
        .bind(category_id)
        .bind(include_deleted)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM vehicle_parts
            WHERE ($1::text IS NULL OR name ILIKE $1 OR part_number ILIKE $1)
              AND ($2::uuid IS NULL OR category_id = $2)
              AND ($3 OR NOT is_deleted)
            "#,
        )
        .bind(pattern)
        .bind(category_id)
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
