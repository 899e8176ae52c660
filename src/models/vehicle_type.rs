//! Modelo de VehicleType

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::audit::Audit;

/// EV model supported by the service center
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VehicleType {
    pub id: Uuid,
    pub model_name: String,
    pub manufacturer: String,
    pub model_year: Option<i32>,
    pub battery_capacity_kwh: Option<Decimal>,
    pub maintenance_interval_km: Option<i32>,
    pub maintenance_interval_months: Option<i32>,
    pub description: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}
