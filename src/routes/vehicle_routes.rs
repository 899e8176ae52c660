use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::vehicle_controller::VehicleController;
use crate::controllers::vehicle_type_controller::VehicleTypeController;
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::vehicle_dto::{CreateVehicleRequest, UpdateVehicleRequest};
use crate::dto::vehicle_type_dto::{CreateVehicleTypeRequest, UpdateVehicleTypeRequest};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::vehicle::Vehicle;
use crate::models::vehicle_type::VehicleType;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_vehicle).get(search_vehicles))
        .route("/:id", get(get_vehicle).put(update_vehicle).delete(delete_vehicle))
        .route("/:id/restore", post(restore_vehicle))
}

pub fn create_vehicle_type_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_type).get(search_types))
        .route("/:id", get(get_type).put(update_type).delete(delete_type))
        .route("/:id/restore", post(restore_type))
}

async fn create_vehicle(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(state.pool.clone());
    Ok(Json(controller.create(&user, request).await?))
}

async fn search_vehicles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<Vehicle>>>, AppError> {
    let controller = VehicleController::new(state.pool.clone());
    Ok(Json(controller.search(&user, &query).await?))
}

async fn get_vehicle(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(state.pool.clone());
    Ok(Json(controller.get(&user, id).await?))
}

async fn update_vehicle(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVehicleRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(state.pool.clone());
    Ok(Json(controller.update(&user, id, request).await?))
}

async fn delete_vehicle(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = VehicleController::new(state.pool.clone());
    Ok(Json(controller.delete(&user, id).await?))
}

async fn restore_vehicle(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = VehicleController::new(state.pool.clone());
    Ok(Json(controller.restore(&user, id).await?))
}

// ---- Tipos de vehículo ----

async fn create_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateVehicleTypeRequest>,
) -> Result<Json<ApiResponse<VehicleType>>, AppError> {
    let controller = VehicleTypeController::new(state.pool.clone());
    Ok(Json(controller.create(&user, request).await?))
}

async fn search_types(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<VehicleType>>>, AppError> {
    let controller = VehicleTypeController::new(state.pool.clone());
    Ok(Json(controller.search(&query).await?))
}

async fn get_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleType>>, AppError> {
    let controller = VehicleTypeController::new(state.pool.clone());
    Ok(Json(controller.get(id).await?))
}

async fn update_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVehicleTypeRequest>,
) -> Result<Json<ApiResponse<VehicleType>>, AppError> {
    let controller = VehicleTypeController::new(state.pool.clone());
    Ok(Json(controller.update(&user, id, request).await?))
}

async fn delete_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = VehicleTypeController::new(state.pool.clone());
    Ok(Json(controller.delete(&user, id).await?))
}

async fn restore_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = VehicleTypeController::new(state.pool.clone());
    Ok(Json(controller.restore(&user, id).await?))
}
