use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::invoice::{Invoice, InvoiceKind, InvoiceStatus};
use crate::utils::errors::AppError;

#[derive(Debug, Clone, Default)]
pub struct InvoiceSearch {
    pub status: Option<InvoiceStatus>,
    pub kind: Option<InvoiceKind>,
    pub customer_id: Option<Uuid>,
    pub pattern: Option<String>,
}

pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(conn: &mut PgConnection, invoice: &Invoice) -> Result<Invoice, AppError> {
        let created = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                id, invoice_number, kind, appointment_id, customer_id, vehicle_id, warranty_package_id,
                payment_method_id, subtotal, tax_amount, total_amount, paid_amount, status,
                issued_at, due_date, paid_at,
                is_deleted, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            RETURNING *
            "#,
        )
        .bind(invoice.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.kind)
        .bind(invoice.appointment_id)
        .bind(invoice.customer_id)
        .bind(invoice.vehicle_id)
        .bind(invoice.warranty_package_id)
        .bind(invoice.payment_method_id)
        .bind(invoice.subtotal)
        .bind(invoice.tax_amount)
        .bind(invoice.total_amount)
        .bind(invoice.paid_amount)
        .bind(invoice.status)
        .bind(invoice.issued_at)
        .bind(invoice.due_date)
        .bind(invoice.paid_at)
        .bind(invoice.audit.is_deleted)
        .bind(invoice.audit.created_at)
        .bind(invoice.audit.created_by)
        .bind(invoice.audit.updated_at)
        .bind(invoice.audit.updated_by)
        .fetch_one(conn)
        .await?;
        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        let found = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 AND NOT is_deleted")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Invoice>, AppError> {
        let found = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE id = $1 AND NOT is_deleted FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(found)
    }

    pub async fn find_by_appointment(conn: &mut PgConnection, appointment_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let found = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE appointment_id = $1 AND NOT is_deleted",
        )
        .bind(appointment_id)
        .fetch_optional(conn)
        .await?;
        Ok(found)
    }

    pub async fn record_payment(
        conn: &mut PgConnection,
        id: Uuid,
        paid_amount: Decimal,
        status: InvoiceStatus,
        paid_at: Option<DateTime<Utc>>,
        payment_method_id: Option<Uuid>,
        actor: Option<Uuid>,
    ) -> Result<Invoice, AppError> {
        let updated = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET paid_amount = $2, status = $3, paid_at = COALESCE($4, paid_at),
                payment_method_id = COALESCE($5, payment_method_id),
                updated_at = NOW(), updated_by = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(paid_amount)
        .bind(status)
        .bind(paid_at)
        .bind(payment_method_id)
        .bind(actor)
        .fetch_one(conn)
        .await?;
        Ok(updated)
    }

    /// UNPAID → CANCELLED in one statement. `None` when the invoice is missing,
    /// deleted or no longer UNPAID.
    pub async fn cancel_unpaid(&self, id: Uuid, actor: Option<Uuid>) -> Result<Option<Invoice>, AppError> {
        let cancelled = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = 'CANCELLED', updated_at = NOW(), updated_by = $2
            WHERE id = $1 AND status = 'UNPAID' AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await?;
        Ok(cancelled)
    }

    pub async fn search(&self, filter: &InvoiceSearch, limit: i64, offset: i64) -> Result<(Vec<Invoice>, i64), AppError> {
        let items = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE NOT is_deleted
              AND ($1::invoice_status IS NULL OR status = $1)
              AND ($2::invoice_kind IS NULL OR kind = $2)
              AND ($3::uuid IS NULL OR customer_id = $3)
              AND ($4::text IS NULL OR invoice_number ILIKE $4)
            ORDER BY issued_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.status)
        .bind(filter.kind)
        .bind(filter.customer_id)
        .bind(&filter.pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM invoices
            WHERE NOT is_deleted
              AND ($1::invoice_status IS NULL OR status = $1)
              AND ($2::invoice_kind IS NULL OR kind = $2)
              AND ($3::uuid IS NULL OR customer_id = $3)
              AND ($4::text IS NULL OR invoice_number ILIKE $4)
            "#,
        )
        .bind(filter.status)
        .bind(filter.kind)
        .bind(filter.customer_id)
        .bind(&filter.pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok((items, total))
    }
}
