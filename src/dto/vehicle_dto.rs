use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

// Request para registrar un vehículo de cliente
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(custom = "crate::utils::validation::validate_vin")]
    pub vin: String,
    #[validate(length(min = 5, max = 20))]
    pub license_plate: String,
    pub vehicle_type_id: Uuid,
    /// Staff may register on behalf of a customer; customers use their own id.
    pub customer_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub mileage_km: Option<i32>,
    pub purchase_date: Option<NaiveDate>,
}

// Request para actualizar un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 5, max = 20))]
    pub license_plate: Option<String>,
    pub vehicle_type_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub mileage_km: Option<i32>,
    pub purchase_date: Option<NaiveDate>,
}
