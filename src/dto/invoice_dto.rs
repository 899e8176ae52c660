use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::invoice::{InvoiceKind, InvoiceStatus};

#[derive(Debug, Deserialize)]
pub struct CashPaymentRequest {
    pub amount: Decimal,
    pub payment_method_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub kind: Option<InvoiceKind>,
    pub customer_id: Option<Uuid>,
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}
