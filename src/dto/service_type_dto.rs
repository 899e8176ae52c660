use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceTypeRequest {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub estimated_duration_minutes: i32,
    pub price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateServiceTypeRequest {
    #[validate(length(min = 1, max = 150))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub estimated_duration_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}
