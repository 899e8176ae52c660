use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::invoice_controller::InvoiceController;
use crate::dto::common_dto::{ApiResponse, PageResponse};
use crate::dto::invoice_dto::{CashPaymentRequest, InvoiceFilter};
use crate::dto::warranty_dto::PurchaseWarrantyRequest;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::invoice::Invoice;
use crate::models::payment::PaymentTransaction;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_invoice_router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_invoices))
        .route("/warranty-purchase", post(purchase_warranty))
        .route("/:id", get(get_invoice))
        .route("/:id/payments", get(list_payments))
        .route("/:id/pay-cash", post(pay_cash))
        .route("/:id/cancel", post(cancel_invoice))
}

async fn search_invoices(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<InvoiceFilter>,
) -> Result<Json<ApiResponse<PageResponse<Invoice>>>, AppError> {
    let controller = InvoiceController::new(&state);
    Ok(Json(controller.search(&user, filter).await?))
}

async fn purchase_warranty(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<PurchaseWarrantyRequest>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    let controller = InvoiceController::new(&state);
    Ok(Json(controller.create_warranty_purchase(&user, request).await?))
}

async fn get_invoice(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    let controller = InvoiceController::new(&state);
    Ok(Json(controller.get(&user, id).await?))
}

async fn list_payments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PaymentTransaction>>>, AppError> {
    let controller = InvoiceController::new(&state);
    Ok(Json(controller.list_payments(&user, id).await?))
}

async fn pay_cash(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CashPaymentRequest>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    let controller = InvoiceController::new(&state);
    Ok(Json(controller.pay_cash(&user, id, request).await?))
}

async fn cancel_invoice(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    let controller = InvoiceController::new(&state);
    Ok(Json(controller.cancel(&user, id).await?))
}
