use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentUrlRequest {
    pub invoice_id: Uuid,
    pub bank_code: Option<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_locale() -> String {
    "vn".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentUrlResponse {
    pub payment_url: String,
    pub txn_ref: String,
    pub amount: Decimal,
    pub expires_at: DateTime<Utc>,
}

/// Body VNPay expects back from the IPN endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpnResponse {
    #[serde(rename = "RspCode")]
    pub rsp_code: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl IpnResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            rsp_code: code.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentReturnResponse {
    pub success: bool,
    pub txn_ref: Option<String>,
    pub invoice_id: Option<Uuid>,
    pub response_code: Option<String>,
    pub message: String,
}
