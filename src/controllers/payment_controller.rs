use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::controllers::invoice_controller::{send_receipt, InvoiceController};
use crate::dto::common_dto::ApiResponse;
use crate::dto::payment_dto::{
    CreatePaymentUrlRequest, IpnResponse, PaymentReturnResponse, PaymentUrlResponse,
};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::invoice::{apply_payment, Invoice, PaymentRejection};
use crate::models::payment::{PaymentMethodType, PaymentTransaction, TransactionStatus};
use crate::repositories::invoice_repository::InvoiceRepository;
use crate::repositories::payment_method_repository::PaymentMethodRepository;
use crate::repositories::payment_repository::{GatewayResult, PaymentRepository};
use crate::repositories::user_repository::UserRepository;
use crate::services::email_service::EmailService;
use crate::services::metrics::Metrics;
use crate::services::vnpay_service::{
    generate_txn_ref, ipn_code, PaymentRequest, VnpayCallback, VnpayService,
};
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError};

/// What processing a gateway callback did.
#[derive(Debug)]
enum CallbackOutcome {
    OrderNotFound,
    InvalidAmount,
    AlreadyConfirmed,
    Paid { invoice: Invoice, amount: Decimal },
    Failed,
    /// The gateway captured money the invoice can no longer take.
    RefundRequired { invoice_id: Uuid, reason: PaymentRejection },
}

impl CallbackOutcome {
    fn ipn(&self) -> IpnResponse {
        match self {
            CallbackOutcome::OrderNotFound => IpnResponse::new(ipn_code::ORDER_NOT_FOUND, "Order not found"),
            CallbackOutcome::InvalidAmount => IpnResponse::new(ipn_code::INVALID_AMOUNT, "Invalid amount"),
            CallbackOutcome::AlreadyConfirmed => IpnResponse::new(ipn_code::ALREADY_CONFIRMED, "Order already confirmed"),
            CallbackOutcome::Paid { .. } | CallbackOutcome::Failed | CallbackOutcome::RefundRequired { .. } => {
                IpnResponse::new(ipn_code::CONFIRMED, "Confirm Success")
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CallbackOutcome::OrderNotFound => "order_not_found",
            CallbackOutcome::InvalidAmount => "invalid_amount",
            CallbackOutcome::AlreadyConfirmed => "already_confirmed",
            CallbackOutcome::Paid { .. } => "paid",
            CallbackOutcome::Failed => "failed",
            CallbackOutcome::RefundRequired { .. } => "refund_required",
        }
    }
}

fn gateway_result(callback: &VnpayCallback, params: &HashMap<String, String>) -> GatewayResult {
    let raw: serde_json::Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    GatewayResult {
        gateway_transaction_no: callback.transaction_no.clone(),
        bank_code: callback.bank_code.clone(),
        response_code: callback.response_code.clone(),
        pay_date: callback.pay_date,
        raw_response: Some(Value::Object(raw)),
    }
}

pub struct PaymentController {
    repository: PaymentRepository,
    invoices: InvoiceRepository,
    methods: PaymentMethodRepository,
    users: UserRepository,
    vnpay: VnpayService,
    email: Arc<EmailService>,
    metrics: Arc<Metrics>,
    pool: PgPool,
}

impl PaymentController {
    pub fn new(state: &AppState) -> Self {
        let pool = state.pool.clone();
        Self {
            repository: PaymentRepository::new(pool.clone()),
            invoices: InvoiceRepository::new(pool.clone()),
            methods: PaymentMethodRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            vnpay: state.vnpay_service(),
            email: Arc::clone(&state.email),
            metrics: Arc::clone(&state.metrics),
            pool,
        }
    }

    /// Signed redirect for the invoice's whole outstanding balance. A PENDING
    /// transaction is stored so the callback can be matched later.
    pub async fn create_payment_url(&self, actor: &AuthenticatedUser, request: CreatePaymentUrlRequest, client_ip: &str) -> Result<ApiResponse<PaymentUrlResponse>, AppError> {
        let invoice = self
            .invoices
            .find_by_id(request.invoice_id)
            .await?
            .ok_or_else(|| not_found_error("Invoice", request.invoice_id))?;
        if !actor.is_staff() && invoice.customer_id != actor.user_id {
            return Err(not_found_error("Invoice", request.invoice_id));
        }
        if !invoice.status.accepts_payment() {
            return Err(AppError::InvalidState(format!(
                "Invoice {} is {:?} and does not accept payments",
                invoice.id, invoice.status
            )));
        }
        let amount = invoice.outstanding();
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidState(format!("Invoice {} has nothing outstanding", invoice.id)));
        }

        let method_id = self
            .methods
            .find_active_by_type(PaymentMethodType::Vnpay)
            .await?
            .map(|m| m.id);
        let now = Utc::now();
        let txn_ref = generate_txn_ref(now);
        let payment_url = self.vnpay.build_payment_url(&PaymentRequest {
            txn_ref: txn_ref.clone(),
            amount,
            order_info: format!("Payment for invoice {}", invoice.invoice_number),
            client_ip: client_ip.to_string(),
            bank_code: request.bank_code,
            locale: request.locale,
            created_at: now,
        })?;

        let txn = PaymentTransaction {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            payment_method_id: method_id,
            txn_ref: txn_ref.clone(),
            amount,
            status: TransactionStatus::Pending,
            gateway_transaction_no: None,
            bank_code: None,
            response_code: None,
            pay_date: None,
            raw_response: None,
            created_at: now,
            updated_at: now,
        };
        self.repository.create(&txn).await?;
        info!(invoice_id = %invoice.id, %txn_ref, %amount, "VNPay payment URL issued");

        Ok(ApiResponse::success(PaymentUrlResponse {
            payment_url,
            txn_ref,
            amount,
            expires_at: self.vnpay.expires_at(now),
        }))
    }

    /// Server-to-server notification. Never fails: every outcome is an
    /// `RspCode` VNPay understands.
    pub async fn handle_ipn(&self, params: HashMap<String, String>) -> IpnResponse {
        if !self.vnpay.verify(&params) {
            warn!("VNPay IPN with invalid signature");
            self.metrics.payment_callbacks.with_label_values(&["invalid_signature"]).inc();
            return IpnResponse::new(ipn_code::INVALID_SIGNATURE, "Invalid signature");
        }
        let Some(callback) = VnpayCallback::from_params(&params) else {
            self.metrics.payment_callbacks.with_label_values(&["order_not_found"]).inc();
            return IpnResponse::new(ipn_code::ORDER_NOT_FOUND, "Order not found");
        };

        match self.process(&callback, &params).await {
            Ok(outcome) => outcome.ipn(),
            Err(e) => {
                error!(txn_ref = %callback.txn_ref, "VNPay IPN processing failed: {}", e);
                self.metrics.payment_callbacks.with_label_values(&["error"]).inc();
                IpnResponse::new(ipn_code::UNKNOWN_ERROR, "Unknown error")
            }
        }
    }

    /// Browser redirect after checkout. Settles the transaction if the IPN has
    /// not arrived yet; otherwise only reports.
    pub async fn handle_return(&self, params: HashMap<String, String>) -> Result<ApiResponse<PaymentReturnResponse>, AppError> {
        if !self.vnpay.verify(&params) {
            return Ok(ApiResponse::success(PaymentReturnResponse {
                success: false,
                txn_ref: params.get("vnp_TxnRef").cloned(),
                invoice_id: None,
                response_code: params.get("vnp_ResponseCode").cloned(),
                message: "Invalid signature".to_string(),
            }));
        }
        let callback = VnpayCallback::from_params(&params)
            .ok_or_else(|| AppError::BadRequest("vnp_TxnRef is missing".to_string()))?;
        let txn = self
            .repository
            .find_by_txn_ref(&callback.txn_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction '{}' not found", callback.txn_ref)))?;

        if txn.status == TransactionStatus::Pending {
            self.process(&callback, &params).await?;
        }

        let success = callback.is_success();
        Ok(ApiResponse::success(PaymentReturnResponse {
            success,
            txn_ref: Some(callback.txn_ref.clone()),
            invoice_id: Some(txn.invoice_id),
            response_code: callback.response_code.clone(),
            message: if success { "Payment successful" } else { "Payment was not completed" }.to_string(),
        }))
    }

    /// Settles one transaction under a row lock, so IPN and return cannot
    /// both apply the same payment.
    async fn process(&self, callback: &VnpayCallback, params: &HashMap<String, String>) -> Result<CallbackOutcome, AppError> {
        let mut tx = self.pool.begin().await?;
        let outcome = match PaymentRepository::lock_by_txn_ref(&mut *tx, &callback.txn_ref).await? {
            None => CallbackOutcome::OrderNotFound,
            Some(txn) if callback.amount != Some(txn.amount) => CallbackOutcome::InvalidAmount,
            Some(txn) if txn.status != TransactionStatus::Pending => CallbackOutcome::AlreadyConfirmed,
            Some(txn) => {
                let result = gateway_result(callback, params);
                if callback.is_success() {
                    let invoice = InvoiceRepository::lock_by_id(&mut *tx, txn.invoice_id)
                        .await?
                        .ok_or_else(|| not_found_error("Invoice", txn.invoice_id))?;
                    // Otra transacción o un pago en efectivo pudo saldar la factura
                    match apply_payment(invoice.status, invoice.total_amount, invoice.paid_amount, txn.amount) {
                        Err(reason) => {
                            PaymentRepository::settle(&mut *tx, txn.id, TransactionStatus::Failed, &result).await?;
                            CallbackOutcome::RefundRequired { invoice_id: invoice.id, reason }
                        }
                        Ok(_) => {
                            PaymentRepository::settle(&mut *tx, txn.id, TransactionStatus::Success, &result).await?;
                            let invoice = InvoiceController::settle_payment(&mut *tx, txn.invoice_id, txn.amount, txn.payment_method_id, None).await?;
                            CallbackOutcome::Paid { invoice, amount: txn.amount }
                        }
                    }
                } else {
                    PaymentRepository::settle(&mut *tx, txn.id, TransactionStatus::Failed, &result).await?;
                    CallbackOutcome::Failed
                }
            }
        };
        tx.commit().await?;

        self.metrics.payment_callbacks.with_label_values(&[outcome.label()]).inc();
        match &outcome {
            CallbackOutcome::Paid { invoice, amount } => {
                info!(txn_ref = %callback.txn_ref, invoice_id = %invoice.id, status = ?invoice.status, "VNPay payment applied");
                send_receipt(&self.users, &self.email, invoice, *amount).await;
            }
            CallbackOutcome::Failed => {
                info!(txn_ref = %callback.txn_ref, response_code = ?callback.response_code, "VNPay payment failed");
            }
            CallbackOutcome::RefundRequired { invoice_id, reason } => {
                error!(txn_ref = %callback.txn_ref, %invoice_id, %reason, "VNPay captured a payment the invoice cannot take, refund needed");
            }
            other => warn!(txn_ref = %callback.txn_ref, outcome = other.label(), "VNPay callback rejected"),
        }
        Ok(outcome)
    }

    pub async fn query_transaction(&self, actor: &AuthenticatedUser, txn_ref: &str, client_ip: &str) -> Result<ApiResponse<Value>, AppError> {
        actor.require_staff("query gateway transactions")?;
        let txn = self
            .repository
            .find_by_txn_ref(txn_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction '{}' not found", txn_ref)))?;
        let response = self.vnpay.query_transaction(&txn.txn_ref, txn.created_at, client_ip).await?;
        Ok(ApiResponse::success(response))
    }

    pub async fn get_transaction(&self, actor: &AuthenticatedUser, txn_ref: &str) -> Result<ApiResponse<PaymentTransaction>, AppError> {
        let txn = self
            .repository
            .find_by_txn_ref(txn_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction '{}' not found", txn_ref)))?;
        if !actor.is_staff() {
            let invoice = self.invoices.find_by_id(txn.invoice_id).await?;
            if invoice.map(|i| i.customer_id) != Some(actor.user_id) {
                return Err(AppError::NotFound(format!("Transaction '{}' not found", txn_ref)));
            }
        }
        Ok(ApiResponse::success(txn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_codes() {
        assert_eq!(CallbackOutcome::OrderNotFound.ipn().rsp_code, "01");
        assert_eq!(CallbackOutcome::InvalidAmount.ipn().rsp_code, "04");
        assert_eq!(CallbackOutcome::AlreadyConfirmed.ipn().rsp_code, "02");
        assert_eq!(CallbackOutcome::Failed.ipn().rsp_code, "00");
    }

    #[test]
    fn test_refund_required_stops_gateway_retries() {
        let outcome = CallbackOutcome::RefundRequired {
            invoice_id: Uuid::new_v4(),
            reason: PaymentRejection::NotPayable(crate::models::invoice::InvoiceStatus::Paid),
        };
        assert_eq!(outcome.ipn().rsp_code, "00");
        assert_eq!(outcome.label(), "refund_required");
    }

    #[test]
    fn test_gateway_result_keeps_raw_params() {
        let mut params = HashMap::new();
        params.insert("vnp_TxnRef".to_string(), "20250601120000123456".to_string());
        params.insert("vnp_Amount".to_string(), "110000000".to_string());
        params.insert("vnp_ResponseCode".to_string(), "00".to_string());
        params.insert("vnp_TransactionStatus".to_string(), "00".to_string());
        params.insert("vnp_TransactionNo".to_string(), "14012345".to_string());
        params.insert("vnp_BankCode".to_string(), "NCB".to_string());

        let callback = VnpayCallback::from_params(&params).unwrap();
        let result = gateway_result(&callback, &params);
        assert_eq!(result.gateway_transaction_no.as_deref(), Some("14012345"));
        assert_eq!(result.bank_code.as_deref(), Some("NCB"));
        assert_eq!(result.response_code.as_deref(), Some("00"));
        let raw = result.raw_response.unwrap();
        assert_eq!(raw["vnp_Amount"], "110000000");
    }
}
