use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::warranty_controller::WarrantyController;
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::warranty_dto::{
    CoverageQuery, CoverageResponse, CreateWarrantyPackageRequest, CreateWarrantyPartRequest,
    CustomerWarrantyQuery, UpdateWarrantyPackageRequest, UpdateWarrantyPartRequest,
};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::warranty::{CustomerWarrantyPart, WarrantyPackage, WarrantyPart};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_warranty_router() -> Router<AppState> {
    Router::new()
        .route("/packages", post(create_package).get(search_packages))
        .route("/packages/:id", get(get_package).put(update_package).delete(delete_package))
        .route("/packages/:id/restore", post(restore_package))
        .route("/packages/:id/parts", post(add_part).get(list_parts))
        .route("/parts/:id", put(update_part).delete(delete_part))
        .route("/parts/:id/restore", post(restore_part))
        .route("/coverage", get(coverage))
        .route("/customer", get(list_for_customer))
        .route("/vehicles/:vehicle_id", get(list_for_vehicle))
}

async fn create_package(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateWarrantyPackageRequest>,
) -> Result<Json<ApiResponse<WarrantyPackage>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.create_package(&user, request).await?))
}

async fn search_packages(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<WarrantyPackage>>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.search_packages(&query).await?))
}

async fn get_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<WarrantyPackage>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.get_package(id).await?))
}

async fn update_package(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateWarrantyPackageRequest>,
) -> Result<Json<ApiResponse<WarrantyPackage>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.update_package(&user, id, request).await?))
}

async fn delete_package(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.delete_package(&user, id).await?))
}

async fn restore_package(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.restore_package(&user, id).await?))
}

async fn add_part(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateWarrantyPartRequest>,
) -> Result<Json<ApiResponse<WarrantyPart>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.add_part(&user, id, request).await?))
}

async fn list_parts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<WarrantyPart>>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.list_parts(id, query.include_deleted()).await?))
}

async fn update_part(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateWarrantyPartRequest>,
) -> Result<Json<ApiResponse<WarrantyPart>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.update_part(&user, id, request).await?))
}

async fn delete_part(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.delete_part(&user, id).await?))
}

async fn restore_part(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.restore_part(&user, id).await?))
}

async fn coverage(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<CoverageQuery>,
) -> Result<Json<ApiResponse<CoverageResponse>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.coverage(&user, query).await?))
}

async fn list_for_customer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<CustomerWarrantyQuery>,
) -> Result<Json<ApiResponse<Vec<CustomerWarrantyPart>>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.list_for_customer(&user, query.customer_id).await?))
}

async fn list_for_vehicle(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<CustomerWarrantyPart>>>, AppError> {
    let controller = WarrantyController::new(state.pool.clone());
    Ok(Json(controller.list_for_vehicle(&user, vehicle_id).await?))
}
