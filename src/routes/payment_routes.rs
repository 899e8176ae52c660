use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use uuid::Uuid;

use crate::controllers::payment_controller::PaymentController;
use crate::controllers::payment_method_controller::PaymentMethodController;
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::payment_dto::{
    CreatePaymentUrlRequest, IpnResponse, PaymentReturnResponse, PaymentUrlResponse,
};
use crate::dto::payment_method_dto::{CreatePaymentMethodRequest, UpdatePaymentMethodRequest};
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::rate_limit::client_ip;
use crate::models::payment::{PaymentMethod, PaymentTransaction};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// VNPay rechaza `vnp_IpAddr` vacío.
const FALLBACK_IP: &str = "127.0.0.1";

/// `/api/payments`, behind authentication.
pub fn create_payment_router() -> Router<AppState> {
    Router::new()
        .route("/vnpay/create-url", post(create_payment_url))
        .route("/vnpay/query/:txn_ref", get(query_transaction))
        .route("/transactions/:txn_ref", get(get_transaction))
}

/// Gateway callbacks. VNPay calls these without a token; the signature is
/// the authentication.
pub fn create_payment_callback_router() -> Router<AppState> {
    Router::new()
        .route("/vnpay/ipn", get(vnpay_ipn))
        .route("/vnpay/return", get(vnpay_return))
}

pub fn create_payment_method_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_method).get(search_methods))
        .route("/:id", get(get_method).put(update_method).delete(delete_method))
        .route("/:id/restore", post(restore_method))
}

fn gateway_ip(headers: &HeaderMap) -> String {
    let ip = client_ip(headers);
    if ip == "unknown" {
        FALLBACK_IP.to_string()
    } else {
        ip
    }
}

async fn create_payment_url(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Json(request): Json<CreatePaymentUrlRequest>,
) -> Result<Json<ApiResponse<PaymentUrlResponse>>, AppError> {
    let controller = PaymentController::new(&state);
    let ip = gateway_ip(&headers);
    Ok(Json(controller.create_payment_url(&user, request, &ip).await?))
}

async fn query_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Path(txn_ref): Path<String>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let controller = PaymentController::new(&state);
    let ip = gateway_ip(&headers);
    Ok(Json(controller.query_transaction(&user, &txn_ref, &ip).await?))
}

async fn get_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(txn_ref): Path<String>,
) -> Result<Json<ApiResponse<PaymentTransaction>>, AppError> {
    let controller = PaymentController::new(&state);
    Ok(Json(controller.get_transaction(&user, &txn_ref).await?))
}

async fn vnpay_ipn(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<IpnResponse> {
    let controller = PaymentController::new(&state);
    Json(controller.handle_ipn(params).await)
}

async fn vnpay_return(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<PaymentReturnResponse>>, AppError> {
    let controller = PaymentController::new(&state);
    Ok(Json(controller.handle_return(params).await?))
}

// ---- Métodos de pago ----

async fn create_method(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePaymentMethodRequest>,
) -> Result<Json<ApiResponse<PaymentMethod>>, AppError> {
    let controller = PaymentMethodController::new(state.pool.clone());
    Ok(Json(controller.create(&user, request).await?))
}

async fn search_methods(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<PaymentMethod>>>, AppError> {
    let controller = PaymentMethodController::new(state.pool.clone());
    Ok(Json(controller.search(&query).await?))
}

async fn get_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PaymentMethod>>, AppError> {
    let controller = PaymentMethodController::new(state.pool.clone());
    Ok(Json(controller.get(id).await?))
}

async fn update_method(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePaymentMethodRequest>,
) -> Result<Json<ApiResponse<PaymentMethod>>, AppError> {
    let controller = PaymentMethodController::new(state.pool.clone());
    Ok(Json(controller.update(&user, id, request).await?))
}

async fn delete_method(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = PaymentMethodController::new(state.pool.clone());
    Ok(Json(controller.delete(&user, id).await?))
}

async fn restore_method(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = PaymentMethodController::new(state.pool.clone());
    Ok(Json(controller.restore(&user, id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_ip_falls_back_to_loopback() {
        assert_eq!(gateway_ip(&HeaderMap::new()), "127.0.0.1");

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.1.2.3".parse().unwrap());
        assert_eq!(gateway_ip(&headers), "10.1.2.3");
    }
}
