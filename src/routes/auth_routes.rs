use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};

use crate::controllers::auth_controller::AuthController;
use crate::dto::auth_dto::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RefreshTokenRequest,
    RegisterRequest, ResetPasswordRequest, TokenResponse,
};
use crate::dto::common_dto::ApiResponse;
use crate::dto::user_dto::UserResponse;
use crate::middleware::auth::{auth_middleware, AuthenticatedUser};
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// `/api/auth`: credential endpoints are public and rate limited; account
/// endpoints need a bearer token.
pub fn create_auth_router(state: AppState) -> Router<AppState> {
    let account = Router::new()
        .route("/me", get(me))
        .route("/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_middleware))
        .merge(account)
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let controller = AuthController::new(&state);
    Ok(Json(controller.register(request).await?))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    let controller = AuthController::new(&state);
    Ok(Json(controller.login(request).await?))
}

async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    let controller = AuthController::new(&state);
    Ok(Json(controller.refresh(request).await?))
}

async fn logout(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = AuthController::new(&state);
    Ok(Json(controller.logout(request).await?))
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = AuthController::new(&state);
    Ok(Json(controller.forgot_password(request).await?))
}

async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = AuthController::new(&state);
    Ok(Json(controller.reset_password(request).await?))
}

async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = AuthController::new(&state);
    Ok(Json(controller.change_password(&user, request).await?))
}

async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let controller = AuthController::new(&state);
    Ok(Json(controller.me(&user).await?))
}
