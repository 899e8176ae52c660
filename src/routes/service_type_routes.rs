use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::service_type_controller::ServiceTypeController;
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::service_type_dto::{CreateServiceTypeRequest, UpdateServiceTypeRequest};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::service_type::ServiceType;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_service_type_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_service_type).get(search_service_types))
        .route("/:id", get(get_service_type).put(update_service_type).delete(delete_service_type))
        .route("/:id/restore", post(restore_service_type))
}

async fn create_service_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateServiceTypeRequest>,
) -> Result<Json<ApiResponse<ServiceType>>, AppError> {
    let controller = ServiceTypeController::new(state.pool.clone());
    Ok(Json(controller.create(&user, request).await?))
}

async fn search_service_types(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<ServiceType>>>, AppError> {
    let controller = ServiceTypeController::new(state.pool.clone());
    Ok(Json(controller.search(&query).await?))
}

async fn get_service_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ServiceType>>, AppError> {
    let controller = ServiceTypeController::new(state.pool.clone());
    Ok(Json(controller.get(id).await?))
}

async fn update_service_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateServiceTypeRequest>,
) -> Result<Json<ApiResponse<ServiceType>>, AppError> {
    let controller = ServiceTypeController::new(state.pool.clone());
    Ok(Json(controller.update(&user, id, request).await?))
}

async fn delete_service_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = ServiceTypeController::new(state.pool.clone());
    Ok(Json(controller.delete(&user, id).await?))
}

async fn restore_service_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = ServiceTypeController::new(state.pool.clone());
    Ok(Json(controller.restore(&user, id).await?))
}
