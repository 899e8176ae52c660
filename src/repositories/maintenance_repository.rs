use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::maintenance::{MaintenanceManagement, MaintenanceRecord, MaintenanceStatus};
use crate::utils::errors::AppError;

pub struct MaintenanceRepository {
    pool: PgPool,
}

impl MaintenanceRepository {
    pub const RECORDS: &'static str = "maintenance_records";

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---- Work orders ----

    pub async fn insert_management(
        conn: &mut PgConnection,
        management: &MaintenanceManagement,
    ) -> Result<MaintenanceManagement, AppError> {
        let created = sqlx::query_as::<_, MaintenanceManagement>(
            r#"
            INSERT INTO maintenance_managements (
                id, appointment_id, service_type_id, technician_id, status, started_at, completed_at,
                labor_cost, parts_cost, total_cost, notes,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(management.id)
        .bind(management.appointment_id)
        .bind(management.service_type_id)
        .bind(management.technician_id)
        .bind(management.status)
        .bind(management.started_at)
        .bind(management.completed_at)
        .bind(management.labor_cost)
        .bind(management.parts_cost)
        .bind(management.total_cost)
        .bind(&management.notes)
        .bind(management.audit.is_deleted)
        .bind(management.audit.created_at)
        .bind(management.audit.created_by)
        .bind(management.audit.updated_at)
        .bind(management.audit.updated_by)
        .fetch_one(conn)
        .await?;
        Ok(created)
    }

    pub async fn find_management(&self, id: Uuid) -> Result<Option<MaintenanceManagement>, AppError> {
        let found = sqlx::query_as::<_, MaintenanceManagement>(
            "SELECT * FROM maintenance_managements WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found)
    }

    pub async fn lock_management(conn: &mut PgConnection, id: Uuid) -> Result<Option<MaintenanceManagement>, AppError> {
        let found = sqlx::query_as::<_, MaintenanceManagement>(
            "SELECT * FROM maintenance_managements WHERE id = $1 AND NOT is_deleted FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(found)
    }

    pub async fn list_by_appointment(&self, appointment_id: Uuid) -> Result<Vec<MaintenanceManagement>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Self::list_by_appointment_conn(&mut conn, appointment_id).await
    }

    pub async fn list_by_appointment_conn(
        conn: &mut PgConnection,
        appointment_id: Uuid,
    ) -> Result<Vec<MaintenanceManagement>, AppError> {
        let items = sqlx::query_as::<_, MaintenanceManagement>(
            r#"
            SELECT * FROM maintenance_managements
            WHERE appointment_id = $1 AND NOT is_deleted
            ORDER BY created_at
            "#,
        )
        .bind(appointment_id)
        .fetch_all(conn)
        .await?;
        Ok(items)
    }

    pub async fn update_management(
        conn: &mut PgConnection,
        management: &MaintenanceManagement,
    ) -> Result<MaintenanceManagement, AppError> {
        let updated = sqlx::query_as::<_, MaintenanceManagement>(
            r#"
            UPDATE maintenance_managements
            SET technician_id = $2, status = $3, started_at = $4, completed_at = $5,
                labor_cost = $6, parts_cost = $7, total_cost = $8, notes = $9,
                updated_at = NOW(), updated_by = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(management.id)
        .bind(management.technician_id)
        .bind(management.status)
        .bind(management.started_at)
        .bind(management.completed_at)
        .bind(management.labor_cost)
        .bind(management.parts_cost)
        .bind(management.total_cost)
        .bind(&management.notes)
        .bind(management.audit.updated_by)
        .fetch_one(conn)
        .await?;
        Ok(updated)
    }

    /// Hands every unfinished work order of an appointment to `technician_id`.
    pub async fn assign_technician(
        conn: &mut PgConnection,
        appointment_id: Uuid,
        technician_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE maintenance_managements
            SET technician_id = $2, updated_at = NOW(), updated_by = $3
            WHERE appointment_id = $1 AND status <> $4 AND NOT is_deleted
            "#,
        )
        .bind(appointment_id)
        .bind(technician_id)
        .bind(actor)
        .bind(MaintenanceStatus::Completed)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    // ---- Records ----

    pub async fn insert_record(&self, record: &MaintenanceRecord) -> Result<MaintenanceRecord, AppError> {
        let created = sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            INSERT INTO maintenance_records (
                id, maintenance_management_id, vehicle_part_id, quantity_used, unit_price,
                warranty_covered, coverage_percentage, approved_by_customer, notes,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(record.maintenance_management_id)
        .bind(record.vehicle_part_id)
        .bind(record.quantity_used)
        .bind(record.unit_price)
        .bind(record.warranty_covered)
        .bind(record.coverage_percentage)
        .bind(record.approved_by_customer)
        .bind(&record.notes)
        .bind(record.audit.is_deleted)
        .bind(record.audit.created_at)
        .bind(record.audit.created_by)
        .bind(record.audit.updated_at)
        .bind(record.audit.updated_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    pub async fn find_record(&self, id: Uuid) -> Result<Option<MaintenanceRecord>, AppError> {
        let found = sqlx::query_as::<_, MaintenanceRecord>(
            "SELECT * FROM maintenance_records WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found)
    }

    pub async fn update_record(&self, record: &MaintenanceRecord) -> Result<MaintenanceRecord, AppError> {
        let updated = sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            UPDATE maintenance_records
            SET quantity_used = $2, approved_by_customer = $3, notes = $4,
                updated_at = NOW(), updated_by = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(record.quantity_used)
        .bind(record.approved_by_customer)
        .bind(&record.notes)
        .bind(record.audit.updated_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    pub async fn soft_delete_record(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::soft_delete(&self.pool, Self::RECORDS, id, actor).await
    }

    pub async fn list_records(&self, management_id: Uuid) -> Result<Vec<MaintenanceRecord>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Self::list_records_conn(&mut conn, management_id).await
    }

    pub async fn list_records_conn(
        conn: &mut PgConnection,
        management_id: Uuid,
    ) -> Result<Vec<MaintenanceRecord>, AppError> {
        let records = sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            SELECT * FROM maintenance_records
            WHERE maintenance_management_id = $1 AND NOT is_deleted
            ORDER BY created_at
            "#,
        )
        .bind(management_id)
        .fetch_all(conn)
        .await?;
        Ok(records)
    }

    /// Rewrites the cost columns from the current records.
    pub async fn store_costs(
        conn: &mut PgConnection,
        id: Uuid,
        parts_cost: rust_decimal::Decimal,
        total_cost: rust_decimal::Decimal,
        actor: Option<Uuid>,
    ) -> Result<MaintenanceManagement, AppError> {
        let updated = sqlx::query_as::<_, MaintenanceManagement>(
            r#"
            UPDATE maintenance_managements
            SET parts_cost = $2, total_cost = $3, updated_at = NOW(), updated_by = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(parts_cost)
        .bind(total_cost)
        .bind(actor)
        .fetch_one(conn)
        .await?;
        Ok(updated)
    }
}
