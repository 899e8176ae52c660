use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehiclePartRequest {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(custom = "crate::utils::validation::validate_part_number")]
    pub part_number: String,
    pub category_id: Uuid,
    pub vehicle_type_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub current_quantity: i32,
    #[validate(range(min = 0))]
    pub minimum_stock_level: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehiclePartRequest {
    #[validate(length(min = 1, max = 150))]
    pub name: Option<String>,
    #[validate(custom = "crate::utils::validation::validate_part_number")]
    pub part_number: Option<String>,
    pub category_id: Option<Uuid>,
    pub vehicle_type_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub minimum_stock_level: Option<i32>,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RestockRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

// Filtro adicional de búsqueda: ?category_id=...
#[derive(Debug, Default, Deserialize)]
pub struct PartFilter {
    pub category_id: Option<Uuid>,
}
