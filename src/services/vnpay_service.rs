//! VNPay gateway (API v2.1.0)
//!
//! Builds signed payment URLs, verifies callback signatures and calls the
//! `querydr` API. Signing: parameters sorted by key, values form-encoded,
//! joined as `k=v&k=v`, then HMAC-SHA512 with the merchant secret (hex).

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use hmac::{Hmac, Mac};
use num_traits::ToPrimitive;
use rand::Rng;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sha2::Sha512;
use tracing::{debug, info};

use crate::config::environment::VnpayConfig;
use crate::utils::errors::{AppError, AppResult};

type HmacSha512 = Hmac<Sha512>;

pub const VERSION: &str = "2.1.0";
pub const SUCCESS_CODE: &str = "00";
const DATE_FORMAT: &str = "%Y%m%d%H%M%S";
const GMT7_SECONDS: i32 = 7 * 3600;

/// IPN response codes
pub mod ipn_code {
    pub const CONFIRMED: &str = "00";
    pub const ORDER_NOT_FOUND: &str = "01";
    pub const ALREADY_CONFIRMED: &str = "02";
    pub const INVALID_AMOUNT: &str = "04";
    pub const INVALID_SIGNATURE: &str = "97";
    pub const UNKNOWN_ERROR: &str = "99";
}

/// One payment attempt to turn into a redirect URL.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub txn_ref: String,
    pub amount: Decimal,
    pub order_info: String,
    pub client_ip: String,
    pub bank_code: Option<String>,
    pub locale: String,
    pub created_at: DateTime<Utc>,
}

/// Fields VNPay sends back on IPN and return redirects.
#[derive(Debug, Clone, PartialEq)]
pub struct VnpayCallback {
    pub txn_ref: String,
    pub amount: Option<Decimal>,
    pub response_code: Option<String>,
    pub transaction_status: Option<String>,
    pub transaction_no: Option<String>,
    pub bank_code: Option<String>,
    pub pay_date: Option<DateTime<Utc>>,
}

impl VnpayCallback {
    pub fn from_params(params: &HashMap<String, String>) -> Option<Self> {
        let txn_ref = params.get("vnp_TxnRef").filter(|v| !v.is_empty())?.clone();
        Some(Self {
            txn_ref,
            amount: params.get("vnp_Amount").and_then(|v| from_vnp_amount(v)),
            response_code: params.get("vnp_ResponseCode").cloned(),
            transaction_status: params.get("vnp_TransactionStatus").cloned(),
            transaction_no: params.get("vnp_TransactionNo").cloned(),
            bank_code: params.get("vnp_BankCode").cloned(),
            pay_date: params.get("vnp_PayDate").and_then(|v| parse_vnp_date(v)),
        })
    }

    pub fn is_success(&self) -> bool {
        self.response_code.as_deref() == Some(SUCCESS_CODE)
            && self.transaction_status.as_deref() == Some(SUCCESS_CODE)
    }
}

fn gmt7() -> FixedOffset {
    FixedOffset::east_opt(GMT7_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// `yyyyMMddHHmmss` in Vietnam time
pub fn format_vnp_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&gmt7()).format(DATE_FORMAT).to_string()
}

pub fn parse_vnp_date(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, DATE_FORMAT).ok()?;
    gmt7()
        .from_local_datetime(&naive)
        .single()
        .map(|at| at.with_timezone(&Utc))
}

/// VND amount as sent to VNPay: no decimals, multiplied by 100.
pub fn to_vnp_amount(amount: Decimal) -> Option<i64> {
    (amount * Decimal::from(100)).round().to_i64()
}

pub fn from_vnp_amount(value: &str) -> Option<Decimal> {
    let raw: i64 = value.parse().ok()?;
    Some(Decimal::from(raw) / Decimal::from(100))
}

/// Form encoding as done by `java.net.URLEncoder`, which VNPay signs against.
pub fn encode_component(value: &str) -> String {
    urlencoding::encode(value)
        .replace("%20", "+")
        .replace('~', "%7E")
        .replace("%2A", "*")
}

/// Canonical `k=v&...` string; empty values are skipped.
pub fn canonical_query<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let sorted: BTreeMap<&String, &String> = params
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .collect();
    sorted
        .into_iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn hmac_sha512(secret: &str, data: &str) -> AppResult<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks `vnp_SecureHash` over every other `vnp_*` parameter.
pub fn verify_signature(secret: &str, params: &HashMap<String, String>) -> bool {
    let Some(received) = params.get("vnp_SecureHash") else {
        return false;
    };
    let signed = params
        .iter()
        .filter(|(k, _)| k.starts_with("vnp_") && *k != "vnp_SecureHash" && *k != "vnp_SecureHashType");
    match hmac_sha512(secret, &canonical_query(signed)) {
        Ok(expected) => expected.eq_ignore_ascii_case(received),
        Err(_) => false,
    }
}

/// Random merchant reference: timestamp plus six digits.
pub fn generate_txn_ref(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{}{:06}", format_vnp_date(now), suffix)
}

pub struct VnpayService {
    config: VnpayConfig,
    http_client: Client,
}

impl VnpayService {
    pub fn new(config: VnpayConfig, http_client: Client) -> Self {
        Self { config, http_client }
    }

    pub fn expires_at(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + Duration::minutes(self.config.expire_minutes)
    }

    pub fn build_payment_url(&self, request: &PaymentRequest) -> AppResult<String> {
        let amount = to_vnp_amount(request.amount)
            .ok_or_else(|| AppError::BadRequest("Amount out of range".to_string()))?;

        let mut params: BTreeMap<String, String> = BTreeMap::new();
        params.insert("vnp_Version".into(), VERSION.into());
        params.insert("vnp_Command".into(), "pay".into());
        params.insert("vnp_TmnCode".into(), self.config.tmn_code.clone());
        params.insert("vnp_Amount".into(), amount.to_string());
        params.insert("vnp_CurrCode".into(), "VND".into());
        params.insert("vnp_TxnRef".into(), request.txn_ref.clone());
        params.insert("vnp_OrderInfo".into(), request.order_info.clone());
        params.insert("vnp_OrderType".into(), "other".into());
        params.insert("vnp_Locale".into(), request.locale.clone());
        params.insert("vnp_ReturnUrl".into(), self.config.return_url.clone());
        params.insert("vnp_IpAddr".into(), request.client_ip.clone());
        params.insert("vnp_CreateDate".into(), format_vnp_date(request.created_at));
        params.insert(
            "vnp_ExpireDate".into(),
            format_vnp_date(self.expires_at(request.created_at)),
        );
        if let Some(bank_code) = request.bank_code.as_ref().filter(|b| !b.is_empty()) {
            params.insert("vnp_BankCode".into(), bank_code.clone());
        }

        let query = canonical_query(&params);
        let secure_hash = hmac_sha512(&self.config.hash_secret, &query)?;
        debug!(txn_ref = %request.txn_ref, "VNPay payment URL signed");

        Ok(format!("{}?{}&vnp_SecureHash={}", self.config.pay_url, query, secure_hash))
    }

    pub fn verify(&self, params: &HashMap<String, String>) -> bool {
        verify_signature(&self.config.hash_secret, params)
    }

    /// Gateway-side status of a transaction (`querydr`).
    pub async fn query_transaction(
        &self,
        txn_ref: &str,
        transaction_date: DateTime<Utc>,
        client_ip: &str,
    ) -> AppResult<Value> {
        let now = Utc::now();
        let request_id = format!("{}{:04}", format_vnp_date(now), rand::thread_rng().gen_range(0..10_000));
        let create_date = format_vnp_date(now);
        let transaction_date = format_vnp_date(transaction_date);
        let order_info = format!("Query transaction {}", txn_ref);

        let data = [
            request_id.as_str(),
            VERSION,
            "querydr",
            self.config.tmn_code.as_str(),
            txn_ref,
            transaction_date.as_str(),
            create_date.as_str(),
            client_ip,
            order_info.as_str(),
        ]
        .join("|");
        let secure_hash = hmac_sha512(&self.config.hash_secret, &data)?;

        let body = json!({
            "vnp_RequestId": request_id,
            "vnp_Version": VERSION,
            "vnp_Command": "querydr",
            "vnp_TmnCode": self.config.tmn_code,
            "vnp_TxnRef": txn_ref,
            "vnp_OrderInfo": order_info,
            "vnp_TransactionDate": transaction_date,
            "vnp_CreateDate": create_date,
            "vnp_IpAddr": client_ip,
            "vnp_SecureHash": secure_hash,
        });

        let response = self
            .http_client
            .post(&self.config.api_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let payload: Value = response.json().await?;
        info!(txn_ref, code = ?payload.get("vnp_ResponseCode"), "VNPay querydr answered");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "SECRETKEY";

    fn signed_params() -> HashMap<String, String> {
        let mut params: HashMap<String, String> = [
            ("vnp_Amount", "11000000"),
            ("vnp_Command", "pay"),
            ("vnp_CreateDate", "20250601120000"),
            ("vnp_CurrCode", "VND"),
            ("vnp_IpAddr", "127.0.0.1"),
            ("vnp_Locale", "vn"),
            ("vnp_OrderInfo", "Thanh toan hoa don INV-20250601-ABC123"),
            ("vnp_OrderType", "other"),
            ("vnp_ReturnUrl", "http://localhost:8080/api/payments/vnpay/return"),
            ("vnp_TmnCode", "DEMO0001"),
            ("vnp_TxnRef", "20250601120000123456"),
            ("vnp_Version", "2.1.0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let hash = hmac_sha512(SECRET, &canonical_query(&params)).unwrap();
        params.insert("vnp_SecureHash".into(), hash);
        params
    }

    #[test]
    fn test_encoding_matches_form_encoding() {
        assert_eq!(encode_component("a b~c*d(e)"), "a+b%7Ec*d%28e%29");
        assert_eq!(encode_component("http://x/y"), "http%3A%2F%2Fx%2Fy");
    }

    #[test]
    fn test_known_signature() {
        let params = signed_params();
        assert_eq!(
            params["vnp_SecureHash"],
            "7e88a5b31e6b0a523cf29a4f5d1c4f7443e930ad20ed3e6e8d3a6d29355708858cdd6b78a9992192d17399c5f143fc457db61058382a3c153f63358a4dd77707"
        );
    }

    #[test]
    fn test_verify_signature() {
        let mut params = signed_params();
        params.insert("vnp_SecureHashType".into(), "HmacSHA512".into());
        assert!(verify_signature(SECRET, &params));

        let upper = params["vnp_SecureHash"].to_uppercase();
        params.insert("vnp_SecureHash".into(), upper);
        assert!(verify_signature(SECRET, &params));

        params.insert("vnp_Amount".into(), "11000001".into());
        assert!(!verify_signature(SECRET, &params));

        params.remove("vnp_SecureHash");
        assert!(!verify_signature(SECRET, &params));
    }

    #[test]
    fn test_amount_and_dates() {
        assert_eq!(to_vnp_amount(Decimal::new(110_000_050, 2)), Some(110_000_050));
        assert_eq!(from_vnp_amount("11000000"), Some(Decimal::from(110_000)));
        assert_eq!(from_vnp_amount("abc"), None);

        let at = Utc.with_ymd_and_hms(2025, 6, 1, 5, 0, 0).unwrap();
        assert_eq!(format_vnp_date(at), "20250601120000");
        assert_eq!(parse_vnp_date("20250601120000"), Some(at));
    }

    #[test]
    fn test_callback_success_requires_both_codes() {
        let mut params = signed_params();
        params.insert("vnp_ResponseCode".into(), "00".into());
        params.insert("vnp_TransactionStatus".into(), "00".into());
        let callback = VnpayCallback::from_params(&params).unwrap();
        assert!(callback.is_success());
        assert_eq!(callback.amount, Some(Decimal::from(110_000)));

        params.insert("vnp_TransactionStatus".into(), "02".into());
        assert!(!VnpayCallback::from_params(&params).unwrap().is_success());

        params.remove("vnp_TxnRef");
        assert!(VnpayCallback::from_params(&params).is_none());
    }

    #[test]
    fn test_payment_url_is_signed() {
        let service = VnpayService::new(
            VnpayConfig {
                tmn_code: "DEMO0001".into(),
                hash_secret: SECRET.into(),
                pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".into(),
                api_url: "https://sandbox.vnpayment.vn/merchant_webapi/api/transaction".into(),
                return_url: "http://localhost:8080/api/payments/vnpay/return".into(),
                expire_minutes: 15,
            },
            Client::new(),
        );
        let url = service
            .build_payment_url(&PaymentRequest {
                txn_ref: "REF1".into(),
                amount: Decimal::from(50_000),
                order_info: "Invoice".into(),
                client_ip: "127.0.0.1".into(),
                bank_code: None,
                locale: "vn".into(),
                created_at: Utc.with_ymd_and_hms(2025, 6, 1, 5, 0, 0).unwrap(),
            })
            .unwrap();

        assert!(url.contains("vnp_Amount=5000000"));
        assert!(url.contains("vnp_ExpireDate=20250601121500"));
        assert!(!url.contains("vnp_BankCode"));

        let query = url.split_once('?').unwrap().1;
        let params: HashMap<String, String> = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| {
                let v = urlencoding::decode(&v.replace('+', " ")).unwrap().into_owned();
                (k.to_string(), v)
            })
            .collect();
        assert!(service.verify(&params));
    }
}
