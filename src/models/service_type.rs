use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::audit::Audit;

/// Bookable service (battery check, brake service, ...)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub estimated_duration_minutes: i32,
    pub price: Decimal,
    pub is_active: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}
