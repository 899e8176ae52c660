//! Repositories
//!
//! SQL access per table. Read and single-statement writes go through the pool
//! held by each repository; steps of a multi-statement business operation take
//! a `&mut PgConnection` borrowed from the caller's transaction.

pub mod appointment_repository;
pub mod invoice_repository;
pub mod maintenance_repository;
pub mod message_repository;
pub mod payment_method_repository;
pub mod payment_repository;
pub mod role_repository;
pub mod service_type_repository;
pub mod shift_repository;
pub mod user_repository;
pub mod vehicle_part_category_repository;
pub mod vehicle_part_repository;
pub mod vehicle_repository;
pub mod vehicle_type_repository;
pub mod warranty_repository;

use sqlx::PgPool;
use uuid::Uuid;

use crate::utils::errors::{map_unique_violation, AppError};

/// Marks a live row deleted. Returns `false` when no live row matched.
pub(crate) async fn soft_delete(
    pool: &PgPool,
    table: &'static str,
    id: Uuid,
    actor: Option<Uuid>,
) -> Result<bool, AppError> {
    let query = format!(
        "UPDATE {table} SET is_deleted = TRUE, updated_at = NOW(), updated_by = $2
         WHERE id = $1 AND NOT is_deleted"
    );
    let result = sqlx::query(&query).bind(id).bind(actor).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Brings a soft-deleted row back. Returns `false` when no deleted row matched,
/// `Conflict` when a live row already holds one of its unique keys.
pub(crate) async fn restore(
    pool: &PgPool,
    table: &'static str,
    id: Uuid,
    actor: Option<Uuid>,
) -> Result<bool, AppError> {
    let query = format!(
        "UPDATE {table} SET is_deleted = FALSE, updated_at = NOW(), updated_by = $2
         WHERE id = $1 AND is_deleted"
    );
    // Un registro vivo puede haber tomado la clave única mientras tanto
    let result = sqlx::query(&query)
        .bind(id)
        .bind(actor)
        .execute(pool)
        .await
        .map_err(|e| map_unique_violation(e, "A live record with the same unique key already exists"))?;
    Ok(result.rows_affected() > 0)
}

/// Whether a row with `id` exists at all, deleted or not.
pub(crate) async fn exists_any(pool: &PgPool, table: &'static str, id: Uuid) -> Result<bool, AppError> {
    let query = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)");
    let exists: bool = sqlx::query_scalar(&query).bind(id).fetch_one(pool).await?;
    Ok(exists)
}
