use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::maintenance::{MaintenanceManagement, MaintenanceRecord};

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMaintenanceRequest {
    pub labor_cost: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMaintenanceRecordRequest {
    pub vehicle_part_id: Uuid,
    #[validate(range(min = 1, max = 1000))]
    pub quantity_used: i32,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMaintenanceRecordRequest {
    #[validate(range(min = 1, max = 1000))]
    pub quantity_used: Option<i32>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRecordRequest {
    pub approved: bool,
}

// Work order con sus líneas
#[derive(Debug, Serialize, Deserialize)]
pub struct MaintenanceResponse {
    #[serde(flatten)]
    pub management: MaintenanceManagement,
    pub records: Vec<MaintenanceRecord>,
}
