use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::appointment_controller::AppointmentController;
use crate::controllers::invoice_controller::InvoiceController;
use crate::controllers::maintenance_controller::MaintenanceController;
use crate::controllers::shift_controller::ShiftController;
use crate::dto::appointment_dto::{
    AppointmentFilter, AppointmentResponse, AssignTechnicianRequest, CreateAppointmentRequest,
    UpdateAppointmentStatusRequest,
};
use crate::dto::common_dto::{ApiResponse, PageResponse};
use crate::dto::maintenance_dto::MaintenanceResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::invoice::Invoice;
use crate::models::shift::Shift;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_appointment_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_appointment).get(search_appointments))
        .route("/:id", get(get_appointment).delete(delete_appointment))
        .route("/:id/confirm", post(confirm_appointment))
        .route("/:id/assign-technician", post(assign_technician))
        .route("/:id/status", put(update_status))
        .route("/:id/cancel", post(cancel_appointment))
        .route("/:id/restore", post(restore_appointment))
        .route("/:id/maintenance", get(list_maintenance))
        .route("/:id/shifts", get(list_shifts))
        .route("/:id/invoice", get(get_invoice).post(generate_invoice))
}

async fn create_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, AppError> {
    let controller = AppointmentController::new(&state);
    Ok(Json(controller.create(&user, request).await?))
}

async fn search_appointments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<ApiResponse<PageResponse<AppointmentResponse>>>, AppError> {
    let controller = AppointmentController::new(&state);
    Ok(Json(controller.search(&user, filter).await?))
}

async fn get_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, AppError> {
    let controller = AppointmentController::new(&state);
    Ok(Json(controller.get(&user, id).await?))
}

async fn confirm_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, AppError> {
    let controller = AppointmentController::new(&state);
    Ok(Json(controller.confirm(&user, id).await?))
}

async fn assign_technician(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignTechnicianRequest>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, AppError> {
    let controller = AppointmentController::new(&state);
    Ok(Json(controller.assign_technician(&user, id, request).await?))
}

async fn update_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentStatusRequest>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, AppError> {
    let controller = AppointmentController::new(&state);
    Ok(Json(controller.update_status(&user, id, request).await?))
}

async fn cancel_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, AppError> {
    let controller = AppointmentController::new(&state);
    Ok(Json(controller.cancel(&user, id).await?))
}

async fn delete_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = AppointmentController::new(&state);
    Ok(Json(controller.delete(&user, id).await?))
}

async fn restore_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = AppointmentController::new(&state);
    Ok(Json(controller.restore(&user, id).await?))
}

async fn list_maintenance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MaintenanceResponse>>>, AppError> {
    let controller = MaintenanceController::new(&state);
    Ok(Json(controller.list_by_appointment(&user, id).await?))
}

async fn list_shifts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Shift>>>, AppError> {
    let controller = ShiftController::new(state.pool.clone());
    Ok(Json(controller.list_by_appointment(&user, id).await?))
}

async fn get_invoice(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    let controller = InvoiceController::new(&state);
    Ok(Json(controller.appointment_invoice(&user, id).await?))
}

async fn generate_invoice(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    let controller = InvoiceController::new(&state);
    Ok(Json(controller.generate_for_appointment(&user, id).await?))
}
