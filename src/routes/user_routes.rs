use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::role_controller::RoleController;
use crate::controllers::user_controller::UserController;
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::role_dto::{CreateRoleRequest, UpdateRoleRequest};
use crate::dto::user_dto::{AssignRolesRequest, CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::role::Role;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_user_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user).get(search_users))
        .route("/technicians", get(list_technicians))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/roles", put(assign_roles))
        .route("/:id/restore", post(restore_user))
}

pub fn create_role_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_role).get(search_roles))
        .route("/:id", get(get_role).put(update_role).delete(delete_role))
        .route("/:id/restore", post(restore_role))
}

// ---- Usuarios ----

async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let controller = UserController::new(state.pool.clone());
    Ok(Json(controller.create(&user, request).await?))
}

async fn search_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<UserResponse>>>, AppError> {
    let controller = UserController::new(state.pool.clone());
    Ok(Json(controller.search(&user, &query).await?))
}

async fn list_technicians(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, AppError> {
    let controller = UserController::new(state.pool.clone());
    Ok(Json(controller.list_technicians(&user).await?))
}

async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let controller = UserController::new(state.pool.clone());
    Ok(Json(controller.get(&user, id).await?))
}

async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let controller = UserController::new(state.pool.clone());
    Ok(Json(controller.update(&user, id, request).await?))
}

async fn assign_roles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignRolesRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let controller = UserController::new(state.pool.clone());
    Ok(Json(controller.assign_roles(&user, id, request).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = UserController::new(state.pool.clone());
    Ok(Json(controller.delete(&user, id).await?))
}

async fn restore_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = UserController::new(state.pool.clone());
    Ok(Json(controller.restore(&user, id).await?))
}

// ---- Roles ----

async fn create_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateRoleRequest>,
) -> Result<Json<ApiResponse<Role>>, AppError> {
    let controller = RoleController::new(state.pool.clone());
    Ok(Json(controller.create(&user, request).await?))
}

async fn search_roles(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<Role>>>, AppError> {
    let controller = RoleController::new(state.pool.clone());
    Ok(Json(controller.search(&query).await?))
}

async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Role>>, AppError> {
    let controller = RoleController::new(state.pool.clone());
    Ok(Json(controller.get(id).await?))
}

async fn update_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<Role>>, AppError> {
    let controller = RoleController::new(state.pool.clone());
    Ok(Json(controller.update(&user, id, request).await?))
}

async fn delete_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = RoleController::new(state.pool.clone());
    Ok(Json(controller.delete(&user, id).await?))
}

async fn restore_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = RoleController::new(state.pool.clone());
    Ok(Json(controller.restore(&user, id).await?))
}
