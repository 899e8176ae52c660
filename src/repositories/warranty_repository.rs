use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::warranty::{CustomerWarrantyPart, WarrantyPackage, WarrantyPart, WarrantyStatus};
use crate::utils::errors::{map_unique_violation, AppError};

pub struct WarrantyRepository {
    pool: PgPool,
}

impl WarrantyRepository {
    pub const PACKAGES: &'static str = "warranty_packages";
    pub const PARTS: &'static str = "warranty_parts";

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---- Paquetes ----

    pub async fn create_package(&self, package: &WarrantyPackage) -> Result<WarrantyPackage, AppError> {
        let created = sqlx::query_as::<_, WarrantyPackage>(
            r#"
            INSERT INTO warranty_packages (
                id, name, description, validity_months, price,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(package.id)
        .bind(&package.name)
        .bind(&package.description)
        .bind(package.validity_months)
        .bind(package.price)
        .bind(package.audit.is_deleted)
        .bind(package.audit.created_at)
        .bind(package.audit.created_by)
        .bind(package.audit.updated_at)
        .bind(package.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Warranty package '{}' already exists", package.name)))?;
        Ok(created)
    }

    pub async fn find_package(&self, id: Uuid) -> Result<Option<WarrantyPackage>, AppError> {
        let found = sqlx::query_as::<_, WarrantyPackage>("SELECT * FROM warranty_packages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    pub async fn update_package(&self, package: &WarrantyPackage) -> Result<WarrantyPackage, AppError> {
        let updated = sqlx::query_as::<_, WarrantyPackage>(
            r#"
            UPDATE warranty_packages
            SET name = $2, description = $3, validity_months = $4, price = $5,
                updated_at = NOW(), updated_by = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(package.id)
        .bind(&package.name)
        .bind(&package.description)
        .bind(package.validity_months)
        .bind(package.price)
        .bind(package.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Warranty package '{}' already exists", package.name)))?;
        Ok(updated)
    }

    pub async fn search_packages(
        &self,
        pattern: Option<&str>,
        include_deleted: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<WarrantyPackage>, i64), AppError> {
        let items = sqlx::query_as::<_, WarrantyPackage>(
            r#"
            SELECT * FROM warranty_packages
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
            SELECT COUNT(*) FROM warranty_packages
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

    pub async fn soft_delete_package(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::soft_delete(&self.pool, Self::PACKAGES, id, actor).await
    }

    pub async fn restore_package(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::restore(&self.pool, Self::PACKAGES, id, actor).await
    }

    // ---- Partes cubiertas ----

    pub async fn create_part(&self, part: &WarrantyPart) -> Result<WarrantyPart, AppError> {
        sqlx::query_as::<_, WarrantyPart>(
            r#"
            INSERT INTO warranty_parts (
                id, warranty_package_id, vehicle_part_id, coverage_percentage,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(part.id)
        .bind(part.warranty_package_id)
        .bind(part.vehicle_part_id)
        .bind(part.coverage_percentage)
        .bind(part.audit.is_deleted)
        .bind(part.audit.created_at)
        .bind(part.audit.created_by)
        .bind(part.audit.updated_at)
        .bind(part.audit.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Part is already covered by this package"))
    }

    pub async fn find_part(&self, id: Uuid) -> Result<Option<WarrantyPart>, AppError> {
        let found = sqlx::query_as::<_, WarrantyPart>("SELECT * FROM warranty_parts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    pub async fn update_part_coverage(
        &self,
        id: Uuid,
        coverage_percentage: i32,
        actor: Option<Uuid>,
    ) -> Result<Option<WarrantyPart>, AppError> {
        let updated = sqlx::query_as::<_, WarrantyPart>(
            r#"
            UPDATE warranty_parts
            SET coverage_percentage = $2, updated_at = NOW(), updated_by = $3
            WHERE id = $1 AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(coverage_percentage)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    pub async fn list_parts(&self, package_id: Uuid, include_deleted: bool) -> Result<Vec<WarrantyPart>, AppError> {
        let parts = sqlx::query_as::<_, WarrantyPart>(
            r#"
            SELECT * FROM warranty_parts
            WHERE warranty_package_id = $1 AND ($2 OR NOT is_deleted)
            ORDER BY created_at
            "#,
        )
        .bind(package_id)
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;
        Ok(parts)
    }

    pub async fn soft_delete_part(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::soft_delete(&self.pool, Self::PARTS, id, actor).await
    }

    pub async fn restore_part(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::restore(&self.pool, Self::PARTS, id, actor).await
    }

    // ---- Cobertura del cliente ----

    pub async fn list_parts_conn(conn: &mut PgConnection, package_id: Uuid) -> Result<Vec<WarrantyPart>, AppError> {
        let parts = sqlx::query_as::<_, WarrantyPart>(
            "SELECT * FROM warranty_parts WHERE warranty_package_id = $1 AND NOT is_deleted",
        )
        .bind(package_id)
        .fetch_all(conn)
        .await?;
        Ok(parts)
    }

    pub async fn find_package_conn(conn: &mut PgConnection, id: Uuid) -> Result<Option<WarrantyPackage>, AppError> {
        let found = sqlx::query_as::<_, WarrantyPackage>("SELECT * FROM warranty_packages WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(found)
    }

    pub async fn insert_customer_part(
        conn: &mut PgConnection,
        part: &CustomerWarrantyPart,
    ) -> Result<CustomerWarrantyPart, AppError> {
        let created = sqlx::query_as::<_, CustomerWarrantyPart>(
            r#"
            INSERT INTO customer_warranty_parts (
                id, customer_id, vehicle_id, warranty_part_id, vehicle_part_id,
                install_date, expiry_date, status,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(part.id)
        .bind(part.customer_id)
        .bind(part.vehicle_id)
        .bind(part.warranty_part_id)
        .bind(part.vehicle_part_id)
        .bind(part.install_date)
        .bind(part.expiry_date)
        .bind(part.status)
        .bind(part.audit.is_deleted)
        .bind(part.audit.created_at)
        .bind(part.audit.created_by)
        .bind(part.audit.updated_at)
        .bind(part.audit.updated_by)
        .fetch_one(conn)
        .await?;
        Ok(created)
    }

    pub async fn list_for_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<CustomerWarrantyPart>, AppError> {
        let parts = sqlx::query_as::<_, CustomerWarrantyPart>(
            r#"
            SELECT * FROM customer_warranty_parts
            WHERE vehicle_id = $1 AND NOT is_deleted
            ORDER BY expiry_date DESC
            "#,
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(parts)
    }

    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<CustomerWarrantyPart>, AppError> {
        let parts = sqlx::query_as::<_, CustomerWarrantyPart>(
            r#"
            SELECT * FROM customer_warranty_parts
            WHERE customer_id = $1 AND NOT is_deleted
            ORDER BY expiry_date DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(parts)
    }

    /// Highest coverage among active warranties for this vehicle part on `on`.
    pub async fn best_coverage(
        &self,
        vehicle_id: Uuid,
        vehicle_part_id: Uuid,
        on: NaiveDate,
    ) -> Result<Option<i32>, AppError> {
        let coverage: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT MAX(wp.coverage_percentage)
            FROM customer_warranty_parts cwp
            JOIN warranty_parts wp ON wp.id = cwp.warranty_part_id
            WHERE cwp.vehicle_id = $1 AND cwp.vehicle_part_id = $2
              AND cwp.status = $3 AND NOT cwp.is_deleted
              AND cwp.install_date <= $4 AND $4 <= cwp.expiry_date
            "#,
        )
        .bind(vehicle_id)
        .bind(vehicle_part_id)
        .bind(WarrantyStatus::Active)
        .bind(on)
        .fetch_one(&self.pool)
        .await?;
        Ok(coverage)
    }

    /// Flips active warranties past their expiry date. Returns rows changed.
    pub async fn expire_before(&self, today: NaiveDate) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE customer_warranty_parts
            SET status = $1, updated_at = NOW()
            WHERE status = $2 AND expiry_date < $3 AND NOT is_deleted
            "#,
        )
        .bind(WarrantyStatus::Expired)
        .bind(WarrantyStatus::Active)
        .bind(today)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
