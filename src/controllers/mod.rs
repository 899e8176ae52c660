//! Controllers
//!
//! Business rules per resource. Handlers in `routes` build a controller per
//! request and hand it the authenticated caller.

pub mod appointment_controller;
pub mod auth_controller;
pub mod invoice_controller;
pub mod maintenance_controller;
pub mod message_controller;
pub mod payment_controller;
pub mod payment_method_controller;
pub mod role_controller;
pub mod service_type_controller;
pub mod shift_controller;
pub mod user_controller;
pub mod vehicle_controller;
pub mod vehicle_part_category_controller;
pub mod vehicle_part_controller;
pub mod vehicle_type_controller;
pub mod warranty_controller;

use sqlx::PgPool;
use uuid::Uuid;

use crate::repositories;
use crate::utils::errors::{not_found_error, AppError, AppResult};

/// Maps the outcome of a soft delete: nothing live matched means not found.
pub(crate) fn deleted_or_not_found(deleted: bool, resource: &str, id: Uuid) -> AppResult<()> {
    if deleted {
        Ok(())
    } else {
        Err(not_found_error(resource, id))
    }
}

/// Maps the outcome of a restore: a live row is a conflict, a missing one not found.
pub(crate) async fn restored_or_error(
    restored: bool,
    pool: &PgPool,
    table: &'static str,
    resource: &str,
    id: Uuid,
) -> AppResult<()> {
    if restored {
        return Ok(());
    }
    if repositories::exists_any(pool, table, id).await? {
        Err(AppError::Conflict(format!("{} '{}' is not deleted", resource, id)))
    } else {
        Err(not_found_error(resource, id))
    }
}

/// Rows that are soft-deleted are treated as absent for writes.
pub(crate) fn live<T>(found: Option<T>, is_deleted: impl Fn(&T) -> bool, resource: &str, id: Uuid) -> AppResult<T> {
    match found {
        Some(row) if !is_deleted(&row) => Ok(row),
        _ => Err(not_found_error(resource, id)),
    }
}
