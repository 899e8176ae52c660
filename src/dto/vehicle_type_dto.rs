use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleTypeRequest {
    #[validate(length(min = 1, max = 100))]
    pub model_name: String,
    #[validate(length(min = 1, max = 100))]
    pub manufacturer: String,
    #[validate(range(min = 2000, max = 2100))]
    pub model_year: Option<i32>,
    pub battery_capacity_kwh: Option<Decimal>,
    #[validate(range(min = 1))]
    pub maintenance_interval_km: Option<i32>,
    #[validate(range(min = 1))]
    pub maintenance_interval_months: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehicleTypeRequest {
    #[validate(length(min = 1, max = 100))]
    pub model_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub manufacturer: Option<String>,
    #[validate(range(min = 2000, max = 2100))]
    pub model_year: Option<i32>,
    pub battery_capacity_kwh: Option<Decimal>,
    #[validate(range(min = 1))]
    pub maintenance_interval_km: Option<i32>,
    #[validate(range(min = 1))]
    pub maintenance_interval_months: Option<i32>,
    pub description: Option<String>,
}
