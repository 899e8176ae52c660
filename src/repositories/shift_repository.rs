use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::shift::{Shift, ShiftStatus};
use crate::utils::errors::AppError;

pub struct ShiftRepository {
    pool: PgPool,
}

impl ShiftRepository {
    pub const TABLE: &'static str = "shifts";

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(conn: &mut PgConnection, shift: &Shift) -> Result<Shift, AppError> {
        let created = sqlx::query_as::<_, Shift>(
            r#"
            INSERT INTO shifts (
                id, technician_id, appointment_id, start_time, end_time, status, notes,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(shift.id)
        .bind(shift.technician_id)
        .bind(shift.appointment_id)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.status)
        .bind(&shift.notes)
        .bind(shift.audit.is_deleted)
        .bind(shift.audit.created_at)
        .bind(shift.audit.created_by)
        .bind(shift.audit.updated_at)
        .bind(shift.audit.updated_by)
        .fetch_one(conn)
        .await?;
        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Shift>, AppError> {
        let found = sqlx::query_as::<_, Shift>("SELECT * FROM shifts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    /// Runs inside the transaction that checked the new window for conflicts.
    pub async fn update(conn: &mut PgConnection, shift: &Shift) -> Result<Shift, AppError> {
        let updated = sqlx::query_as::<_, Shift>(
            r#"
            UPDATE shifts
            SET start_time = $2, end_time = $3, notes = $4, status = $5,
                updated_at = NOW(), updated_by = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(shift.id)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(&shift.notes)
        .bind(shift.status)
        .bind(shift.audit.updated_by)
        .fetch_one(conn)
        .await?;
        Ok(updated)
    }

    /// Live, non-cancelled shifts of a technician touching `[start, end)`.
    ///
    /// The caller's transaction should hold a lock on the technician before
    /// relying on the result.
    pub async fn blocking_in_window(
        conn: &mut PgConnection,
        technician_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Shift>, AppError> {
        let shifts = sqlx::query_as::<_, Shift>(
            r#"
            SELECT * FROM shifts
            WHERE technician_id = $1 AND NOT is_deleted AND status <> $2
              AND start_time < $4 AND $3 < end_time
            ORDER BY start_time
            "#,
        )
        .bind(technician_id)
        .bind(ShiftStatus::Cancelled)
        .bind(start)
        .bind(end)
        .fetch_all(conn)
        .await?;
        Ok(shifts)
    }

    /// Serializes scheduling for one technician until the transaction ends.
    pub async fn lock_technician(conn: &mut PgConnection, technician_id: Uuid) -> Result<(), AppError> {
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(technician_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn list(
        &self,
        technician_id: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Shift>, AppError> {
        let shifts = sqlx::query_as::<_, Shift>(
            r#"
            SELECT * FROM shifts
            WHERE NOT is_deleted
              AND ($1::uuid IS NULL OR technician_id = $1)
              AND ($2::timestamptz IS NULL OR end_time > $2)
              AND ($3::timestamptz IS NULL OR start_time < $3)
            ORDER BY start_time
            "#,
        )
        .bind(technician_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(shifts)
    }

    pub async fn list_by_appointment(&self, appointment_id: Uuid) -> Result<Vec<Shift>, AppError> {
        let shifts = sqlx::query_as::<_, Shift>(
            "SELECT * FROM shifts WHERE appointment_id = $1 AND NOT is_deleted ORDER BY start_time",
        )
        .bind(appointment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shifts)
    }

    /// Technicians with a blocking shift in `[start, end)`.
    pub async fn busy_technicians(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT technician_id FROM shifts
            WHERE NOT is_deleted AND status <> $1
              AND start_time < $3 AND $2 < end_time
            "#,
        )
        .bind(ShiftStatus::Cancelled)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn set_status(&self, id: Uuid, status: ShiftStatus, actor: Option<Uuid>) -> Result<Shift, AppError> {
        let updated = sqlx::query_as::<_, Shift>(
            r#"
            UPDATE shifts
            SET status = $2, updated_at = NOW(), updated_by = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(actor)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    /// Moves an appointment's shifts found in `from` to `to`. Returns rows changed.
    pub async fn transition_for_appointment(
        conn: &mut PgConnection,
        appointment_id: Uuid,
        from: &[ShiftStatus],
        to: ShiftStatus,
        actor: Option<Uuid>,
    ) -> Result<u64, AppError> {
        let mut changed = 0;
        for status in from {
            let result = sqlx::query(
                r#"
                UPDATE shifts
                SET status = $3, updated_at = NOW(), updated_by = $4
                WHERE appointment_id = $1 AND status = $2 AND NOT is_deleted
                "#,
            )
            .bind(appointment_id)
            .bind(*status)
            .bind(to)
            .bind(actor)
            .execute(&mut *conn)
            .await?;
            changed += result.rows_affected();
        }
        Ok(changed)
    }

    /// Applies the time-window rules to every live shift at `now`.
    ///
    /// Returns `(started, completed)` row counts.
    pub async fn reconcile_all(&self, now: DateTime<Utc>) -> Result<(u64, u64), AppError> {
        let mut tx = self.pool.begin().await?;

        let completed = sqlx::query(
            r#"
            UPDATE shifts
            SET status = $1, updated_at = NOW()
            WHERE status IN ($2, $3) AND end_time <= $4 AND NOT is_deleted
            "#,
        )
        .bind(ShiftStatus::Completed)
        .bind(ShiftStatus::Scheduled)
        .bind(ShiftStatus::InProgress)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let started = sqlx::query(
            r#"
            UPDATE shifts
            SET status = $1, updated_at = NOW()
            WHERE status = $2 AND start_time <= $3 AND $3 < end_time AND NOT is_deleted
            "#,
        )
        .bind(ShiftStatus::InProgress)
        .bind(ShiftStatus::Scheduled)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok((started, completed))
    }

    pub async fn soft_delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        super::soft_delete(&self.pool, Self::TABLE, id, actor).await
    }
}
