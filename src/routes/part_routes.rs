use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::vehicle_part_category_controller::VehiclePartCategoryController;
use crate::controllers::vehicle_part_controller::VehiclePartController;
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::vehicle_part_dto::{
    CreateCategoryRequest, CreateVehiclePartRequest, PartFilter, RestockRequest,
    UpdateCategoryRequest, UpdateVehiclePartRequest,
};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::vehicle_part::VehiclePart;
use crate::models::vehicle_part_category::VehiclePartCategory;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_part_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_part).get(search_parts))
        .route("/low-stock", get(low_stock))
        .route("/:id", get(get_part).put(update_part).delete(delete_part))
        .route("/:id/restock", post(restock_part))
        .route("/:id/restore", post(restore_part))
}

pub fn create_category_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_category).get(search_categories))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
        .route("/:id/restore", post(restore_category))
}

async fn create_part(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateVehiclePartRequest>,
) -> Result<Json<ApiResponse<VehiclePart>>, AppError> {
    let controller = VehiclePartController::new(state.pool.clone());
    Ok(Json(controller.create(&user, request).await?))
}

async fn search_parts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    Query(filter): Query<PartFilter>,
) -> Result<Json<ApiResponse<PageResponse<VehiclePart>>>, AppError> {
    let controller = VehiclePartController::new(state.pool.clone());
    Ok(Json(controller.search(&query, &filter).await?))
}

async fn low_stock(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<VehiclePart>>>, AppError> {
    let controller = VehiclePartController::new(state.pool.clone());
    Ok(Json(controller.low_stock(&user).await?))
}

async fn get_part(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehiclePart>>, AppError> {
    let controller = VehiclePartController::new(state.pool.clone());
    Ok(Json(controller.get(id).await?))
}

async fn update_part(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVehiclePartRequest>,
) -> Result<Json<ApiResponse<VehiclePart>>, AppError> {
    let controller = VehiclePartController::new(state.pool.clone());
    Ok(Json(controller.update(&user, id, request).await?))
}

async fn restock_part(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RestockRequest>,
) -> Result<Json<ApiResponse<VehiclePart>>, AppError> {
    let controller = VehiclePartController::new(state.pool.clone());
    Ok(Json(controller.restock(&user, id, request).await?))
}

async fn delete_part(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = VehiclePartController::new(state.pool.clone());
    Ok(Json(controller.delete(&user, id).await?))
}

async fn restore_part(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = VehiclePartController::new(state.pool.clone());
    Ok(Json(controller.restore(&user, id).await?))
}

// ---- Categorías ----

async fn create_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<Json<ApiResponse<VehiclePartCategory>>, AppError> {
    let controller = VehiclePartCategoryController::new(state.pool.clone());
    Ok(Json(controller.create(&user, request).await?))
}

async fn search_categories(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<VehiclePartCategory>>>, AppError> {
    let controller = VehiclePartCategoryController::new(state.pool.clone());
    Ok(Json(controller.search(&query).await?))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehiclePartCategory>>, AppError> {
    let controller = VehiclePartCategoryController::new(state.pool.clone());
    Ok(Json(controller.get(id).await?))
}

async fn update_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<VehiclePartCategory>>, AppError> {
    let controller = VehiclePartCategoryController::new(state.pool.clone());
    Ok(Json(controller.update(&user, id, request).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = VehiclePartCategoryController::new(state.pool.clone());
    Ok(Json(controller.delete(&user, id).await?))
}

async fn restore_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = VehiclePartCategoryController::new(state.pool.clone());
    Ok(Json(controller.restore(&user, id).await?))
}
