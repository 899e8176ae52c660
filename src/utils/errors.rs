//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Hash error: {0}")]
    Hash(String),

    #[error("External API error: {0}")]
    ExternalApi(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: String,
}

impl ErrorResponse {
    fn new(error: &str, message: String, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message,
            details: None,
            code: code.to_string(),
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Cache(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ExternalApi(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) | AppError::Hash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }

        let body = match self {
            AppError::Database(sqlx::Error::RowNotFound) => ErrorResponse::new(
                "Not Found",
                "The requested record does not exist".to_string(),
                "NOT_FOUND",
            ),
            AppError::Database(_) => ErrorResponse::new(
                "Database Error",
                "An error occurred while accessing the database".to_string(),
                "DB_ERROR",
            ),
            AppError::Validation(e) => ErrorResponse::new(
                "Validation Error",
                "The provided data is invalid".to_string(),
                "VALIDATION_ERROR",
            )
            .with_details(json!(e)),
            AppError::Unauthorized(msg) => ErrorResponse::new("Unauthorized", msg, "UNAUTHORIZED"),
            AppError::Forbidden(msg) => ErrorResponse::new("Forbidden", msg, "FORBIDDEN"),
            AppError::NotFound(msg) => ErrorResponse::new("Not Found", msg, "NOT_FOUND"),
            AppError::Conflict(msg) => ErrorResponse::new("Conflict", msg, "CONFLICT"),
            AppError::BadRequest(msg) => ErrorResponse::new("Bad Request", msg, "BAD_REQUEST"),
            AppError::InvalidState(msg) => {
                ErrorResponse::new("Invalid State", msg, "INVALID_STATE")
            }
            AppError::Internal(_) => ErrorResponse::new(
                "Internal Server Error",
                "An unexpected error occurred".to_string(),
                "INTERNAL_ERROR",
            ),
            AppError::RateLimitExceeded => ErrorResponse::new(
                "Rate Limit Exceeded",
                "Too many requests. Please try again later".to_string(),
                "RATE_LIMIT_EXCEEDED",
            ),
            AppError::Cache(_) => ErrorResponse::new(
                "Service Unavailable",
                "The token store is unavailable".to_string(),
                "CACHE_ERROR",
            ),
            AppError::Jwt(msg) => ErrorResponse::new("JWT Error", msg, "JWT_ERROR"),
            AppError::Hash(_) => ErrorResponse::new(
                "Hash Error",
                "An error occurred while processing credentials".to_string(),
                "HASH_ERROR",
            ),
            AppError::ExternalApi(_) => ErrorResponse::new(
                "External API Error",
                "An error occurred while communicating with external service".to_string(),
                "EXTERNAL_API_ERROR",
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::Cache(e.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Hash(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::ExternalApi(e.to_string())
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de conflicto
pub fn conflict_error(resource: &str, field: &str, value: &str) -> AppError {
    AppError::Conflict(format!("{} with {} '{}' already exists", resource, field, value))
}

/// Función helper para crear errores de acceso prohibido
pub fn forbidden_error(operation: &str, reason: &str) -> AppError {
    AppError::Forbidden(format!("Cannot {}: {}", operation, reason))
}

/// Función helper para crear errores de solicitud incorrecta
pub fn bad_request_error(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

/// Maps a unique-constraint violation to `Conflict`, everything else to `Database`.
pub fn map_unique_violation(e: sqlx::Error, message: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidState("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::Jwt("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::RateLimitExceeded.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = AppError::Conflict("Role with name 'ADMIN' already exists".into())
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "CONFLICT");
        assert_eq!(body["message"], "Role with name 'ADMIN' already exists");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Internal("secret stack".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_helpers() {
        let err = not_found_error("Vehicle part", "abc");
        assert_eq!(err.to_string(), "Not found: Vehicle part with id 'abc' not found");
        let err = conflict_error("Role", "name", "ADMIN");
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
