use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::maintenance_controller::MaintenanceController;
use crate::dto::common_dto::ApiResponse;
use crate::dto::maintenance_dto::{
    ApproveRecordRequest, CreateMaintenanceRecordRequest, MaintenanceResponse,
    UpdateMaintenanceRecordRequest, UpdateMaintenanceRequest,
};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::maintenance::MaintenanceRecord;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Work orders (`/api/maintenance`) and their part lines (`/api/maintenance/records`).
pub fn create_maintenance_router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_management).put(update_management))
        .route("/:id/start", post(start_management))
        .route("/:id/complete", post(complete_management))
        .route("/:id/records", post(add_record).get(list_records))
        .route("/records/:record_id", put(update_record).delete(remove_record))
        .route("/records/:record_id/approve", post(approve_record))
}

async fn get_management(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MaintenanceResponse>>, AppError> {
    let controller = MaintenanceController::new(&state);
    Ok(Json(controller.get(&user, id).await?))
}

async fn update_management(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMaintenanceRequest>,
) -> Result<Json<ApiResponse<MaintenanceResponse>>, AppError> {
    let controller = MaintenanceController::new(&state);
    Ok(Json(controller.update(&user, id, request).await?))
}

async fn start_management(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MaintenanceResponse>>, AppError> {
    let controller = MaintenanceController::new(&state);
    Ok(Json(controller.start(&user, id).await?))
}

async fn complete_management(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MaintenanceResponse>>, AppError> {
    let controller = MaintenanceController::new(&state);
    Ok(Json(controller.complete(&user, id).await?))
}

async fn add_record(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateMaintenanceRecordRequest>,
) -> Result<Json<ApiResponse<MaintenanceRecord>>, AppError> {
    let controller = MaintenanceController::new(&state);
    Ok(Json(controller.add_record(&user, id, request).await?))
}

async fn list_records(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MaintenanceRecord>>>, AppError> {
    let controller = MaintenanceController::new(&state);
    Ok(Json(controller.list_records(&user, id).await?))
}

async fn update_record(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(record_id): Path<Uuid>,
    Json(request): Json<UpdateMaintenanceRecordRequest>,
) -> Result<Json<ApiResponse<MaintenanceRecord>>, AppError> {
    let controller = MaintenanceController::new(&state);
    Ok(Json(controller.update_record(&user, record_id, request).await?))
}

async fn remove_record(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(record_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = MaintenanceController::new(&state);
    Ok(Json(controller.remove_record(&user, record_id).await?))
}

async fn approve_record(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(record_id): Path<Uuid>,
    Json(request): Json<ApproveRecordRequest>,
) -> Result<Json<ApiResponse<MaintenanceRecord>>, AppError> {
    let controller = MaintenanceController::new(&state);
    Ok(Json(controller.approve_record(&user, record_id, request).await?))
}
