use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWarrantyPackageRequest {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 120))]
    pub validity_months: i32,
    pub price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWarrantyPackageRequest {
    #[validate(length(min = 1, max = 150))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 120))]
    pub validity_months: Option<i32>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWarrantyPartRequest {
    pub vehicle_part_id: Uuid,
    #[validate(range(min = 0, max = 100))]
    pub coverage_percentage: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWarrantyPartRequest {
    #[validate(range(min = 0, max = 100))]
    pub coverage_percentage: i32,
}

/// Purchase a package for one of the customer's vehicles.
#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseWarrantyRequest {
    pub warranty_package_id: Uuid,
    pub vehicle_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CoverageQuery {
    pub vehicle_id: Uuid,
    pub vehicle_part_id: Uuid,
    pub on: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CoverageResponse {
    pub vehicle_id: Uuid,
    pub vehicle_part_id: Uuid,
    pub on: NaiveDate,
    /// 0 when no active warranty covers the part
    pub coverage_percentage: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerWarrantyQuery {
    pub customer_id: Option<Uuid>,
}
