use serde::Deserialize;
use validator::Validate;

use crate::models::payment::PaymentMethodType;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentMethodRequest {
    pub method_type: PaymentMethodType,
    #[validate(length(min = 1, max = 100))]
    pub provider: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePaymentMethodRequest {
    pub method_type: Option<PaymentMethodType>,
    #[validate(length(min = 1, max = 100))]
    pub provider: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}
