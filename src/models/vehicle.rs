//! Modelo de Vehicle
//!
//! A customer's car registered with the service center.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::audit::Audit;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub vin: String,
    pub license_plate: String,
    pub vehicle_type_id: Uuid,
    pub customer_id: Uuid,
    pub mileage_km: i32,
    pub purchase_date: Option<NaiveDate>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}
