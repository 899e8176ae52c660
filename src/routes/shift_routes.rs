use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::shift_controller::ShiftController;
use crate::dto::common_dto::ApiResponse;
use crate::dto::shift_dto::{AvailabilityQuery, CreateShiftRequest, ShiftFilter, UpdateShiftRequest};
use crate::dto::user_dto::UserResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::shift::Shift;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_shift_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_shift).get(list_shifts))
        .route("/available", get(available_technicians))
        .route("/:id", get(get_shift).put(update_shift).delete(delete_shift))
        .route("/:id/cancel", post(cancel_shift))
}

async fn create_shift(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateShiftRequest>,
) -> Result<Json<ApiResponse<Shift>>, AppError> {
    let controller = ShiftController::new(state.pool.clone());
    Ok(Json(controller.create(&user, request).await?))
}

async fn list_shifts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<ShiftFilter>,
) -> Result<Json<ApiResponse<Vec<Shift>>>, AppError> {
    let controller = ShiftController::new(state.pool.clone());
    Ok(Json(controller.list(&user, filter).await?))
}

async fn available_technicians(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, AppError> {
    let controller = ShiftController::new(state.pool.clone());
    Ok(Json(controller.available_technicians(&user, query).await?))
}

async fn get_shift(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Shift>>, AppError> {
    let controller = ShiftController::new(state.pool.clone());
    Ok(Json(controller.get(&user, id).await?))
}

async fn update_shift(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateShiftRequest>,
) -> Result<Json<ApiResponse<Shift>>, AppError> {
    let controller = ShiftController::new(state.pool.clone());
    Ok(Json(controller.update(&user, id, request).await?))
}

async fn cancel_shift(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Shift>>, AppError> {
    let controller = ShiftController::new(state.pool.clone());
    Ok(Json(controller.cancel(&user, id).await?))
}

async fn delete_shift(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = ShiftController::new(state.pool.clone());
    Ok(Json(controller.delete(&user, id).await?))
}
