use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::appointment::{Appointment, AppointmentStatus};
use crate::models::service_type::ServiceType;
use crate::utils::errors::AppError;

/// Filters for appointment listing; `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct AppointmentSearch {
    pub status: Option<AppointmentStatus>,
    pub customer_id: Option<Uuid>,
    pub technician_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub include_deleted: bool,
}

pub struct AppointmentRepository {
    pool: PgPool,
}

impl AppointmentRepository {
    pub const TABLE: &'static str = "appointments";

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_with_services(
        &self,
        appointment: &Appointment,
        service_type_ids: &[Uuid],
    ) -> Result<Appointment, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (
                id, customer_id, vehicle_id, technician_id, assignee_id, scheduled_at, status, notes,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.customer_id)
        .bind(appointment.vehicle_id)
        .bind(appointment.technician_id)
        .bind(appointment.assignee_id)
        .bind(appointment.scheduled_at)
        .bind(appointment.status)
        .bind(&appointment.notes)
        .bind(appointment.audit.is_deleted)
        .bind(appointment.audit.created_at)
        .bind(appointment.audit.created_by)
        .bind(appointment.audit.updated_at)
        .bind(appointment.audit.updated_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO appointment_service_types (appointment_id, service_type_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(created.id)
        .bind(service_type_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppError> {
        let found = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    /// Row-locked read for status changes inside a transaction.
    pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Appointment>, AppError> {
        let found = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(found)
    }

    pub async fn service_type_ids(&self, appointment_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT service_type_id FROM appointment_service_types WHERE appointment_id = $1 ORDER BY service_type_id",
        )
        .bind(appointment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Service type ids for several appointments at once.
    pub async fn service_type_ids_for(&self, appointment_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Uuid>>, AppError> {
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT appointment_id, service_type_id FROM appointment_service_types
            WHERE appointment_id = ANY($1)
            ORDER BY appointment_id, service_type_id
            "#,
        )
        .bind(appointment_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (appointment_id, service_type_id) in rows {
            grouped.entry(appointment_id).or_default().push(service_type_id);
        }
        Ok(grouped)
    }

    pub async fn service_types(&self, appointment_id: Uuid) -> Result<Vec<ServiceType>, AppError> {
        let types = sqlx::query_as::<_, ServiceType>(
            r#"
            SELECT st.* FROM service_types st
            JOIN appointment_service_types ast ON ast.service_type_id = st.id
            WHERE ast.appointment_id = $1
            ORDER BY st.name
            "#,
        )
        .bind(appointment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }

    pub async fn update_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: AppointmentStatus,
        actor: Option<Uuid>,
    ) -> Result<Appointment, AppError> {
        let updated = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET status = $2, updated_at = NOW(), updated_by = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(actor)
        .fetch_one(conn)
        .await?;
        Ok(updated)
    }

    pub async fn set_assignee(
        conn: &mut PgConnection,
        id: Uuid,
        assignee_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<Appointment, AppError> {
        let updated = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET assignee_id = $2, updated_at = NOW(), updated_by = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(assignee_id)
        .bind(actor)
        .fetch_one(conn)
        .await?;
        Ok(updated)
    }

    pub async fn set_technician(
        conn: &mut PgConnection,
        id: Uuid,
        technician_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<Appointment, AppError> {
        let updated = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET technician_id = $2, updated_at = NOW(), updated_by = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(technician_id)
        .bind(actor)
        .fetch_one(conn)
        .await?;
        Ok(updated)
    }

    pub async fn search(
        &self,
        filter: &AppointmentSearch,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Appointment>, i64), AppError> {
        let items = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT * FROM appointments
            WHERE ($1::appointment_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR customer_id = $2)
              AND ($3::uuid IS NULL OR technician_id = $3)
              AND ($4::timestamptz IS NULL OR scheduled_at >= $4)
              AND ($5::timestamptz IS NULL OR scheduled_at < $5)
              AND ($6 OR NOT is_deleted)
            ORDER BY scheduled_at DESC
            LIMIT $7 OFFSET $8
            "#,
        )
        .bind(filter.status)
        .bind(filter.customer_id)
        .bind(filter.technician_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.include_deleted)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE ($1::appointment_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR customer_id = $2)
              AND ($3::uuid IS NULL OR technician_id = $3)
              AND ($4::timestamptz IS NULL OR scheduled_at >= $4)
              AND ($5::timestamptz IS NULL OR scheduled_at < $5)
              AND ($6 OR NOT is_deleted)
            "#,
        )
        .bind(filter.status)
        .bind(filter.customer_id)
        .bind(filter.technician_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.include_deleted)
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
