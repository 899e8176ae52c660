//! HTTP routes
//!
//! Cada módulo expone un `Router<AppState>` por recurso; `create_router`
//! los monta bajo `/api` con la autenticación y las capas comunes.

pub mod appointment_routes;
pub mod auth_routes;
pub mod invoice_routes;
pub mod maintenance_routes;
pub mod message_routes;
pub mod part_routes;
pub mod payment_routes;
pub mod service_type_routes;
pub mod shift_routes;
pub mod user_routes;
pub mod vehicle_routes;
pub mod warranty_routes;

use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::warn;

use crate::middleware::auth::auth_middleware;
use crate::middleware::cors::cors_middleware;
use crate::state::AppState;
use crate::utils::errors::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/users", user_routes::create_user_router())
        .nest("/roles", user_routes::create_role_router())
        .nest("/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/vehicle-types", vehicle_routes::create_vehicle_type_router())
        .nest("/parts", part_routes::create_part_router())
        .nest("/part-categories", part_routes::create_category_router())
        .nest("/service-types", service_type_routes::create_service_type_router())
        .nest("/appointments", appointment_routes::create_appointment_router())
        .nest("/maintenance", maintenance_routes::create_maintenance_router())
        .nest("/shifts", shift_routes::create_shift_router())
        .nest("/invoices", invoice_routes::create_invoice_router())
        .nest("/payments", payment_routes::create_payment_router())
        .nest("/payment-methods", payment_routes::create_payment_method_router())
        .nest("/warranty", warranty_routes::create_warranty_router())
        .nest("/messages", message_routes::create_message_router())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new()
        .nest("/auth", auth_routes::create_auth_router(state.clone()))
        .nest("/payments", payment_routes::create_payment_callback_router())
        .nest("/chat", message_routes::create_chat_socket_router())
        .merge(protected);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/metrics", get(metrics))
        .nest("/api", api)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(cors_middleware(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness; no toca la base de datos.
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn readiness(State(state): State<AppState>) -> Response {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => Json(json!({ "status": "ready" })).into_response(),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}

async fn metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = state.metrics.render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
