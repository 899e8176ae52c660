//! Middleware de Rate Limiting
//!
//! Fixed-window counter per client IP, kept in memory. Applied to the
//! authentication endpoints.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::EnvironmentConfig;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Estructura para almacenar información de rate limiting por IP
#[derive(Debug, Clone)]
struct RateLimitInfo {
    requests: u32,
    window_start: Instant,
}

/// Estado global del rate limiting
#[derive(Clone)]
pub struct RateLimitState {
    requests: Arc<RwLock<HashMap<String, RateLimitInfo>>>,
    max_requests: u32,
    window_duration: Duration,
}

impl RateLimitState {
    pub fn new(config: &EnvironmentConfig) -> Self {
        Self::with_limits(config.rate_limit_requests, Duration::from_secs(config.rate_limit_window))
    }

    pub fn with_limits(max_requests: u32, window_duration: Duration) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window_duration,
        }
    }

    /// Verificar si una IP ha excedido el límite
    pub async fn check_rate_limit(&self, ip: &str) -> Result<(), AppError> {
        let mut requests = self.requests.write().await;
        let now = Instant::now();

        // Limpiar entradas expiradas
        requests.retain(|_, info| now.duration_since(info.window_start) < self.window_duration);

        let info = requests.entry(ip.to_string()).or_insert(RateLimitInfo {
            requests: 0,
            window_start: now,
        });

        if info.requests >= self.max_requests {
            return Err(AppError::RateLimitExceeded);
        }

        info.requests += 1;
        Ok(())
    }
}

/// First address of `X-Forwarded-For`, or `unknown`.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware de rate limiting
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(request.headers());
    if let Err(e) = state.rate_limit.check_rate_limit(&ip).await {
        warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
        return Err(e);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limit_per_ip() {
        let limiter = RateLimitState::with_limits(2, Duration::from_secs(60));
        assert!(limiter.check_rate_limit("1.1.1.1").await.is_ok());
        assert!(limiter.check_rate_limit("1.1.1.1").await.is_ok());
        assert!(matches!(
            limiter.check_rate_limit("1.1.1.1").await,
            Err(AppError::RateLimitExceeded)
        ));
        assert!(limiter.check_rate_limit("2.2.2.2").await.is_ok());
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimitState::with_limits(1, Duration::from_millis(20));
        assert!(limiter.check_rate_limit("ip").await.is_ok());
        assert!(limiter.check_rate_limit("ip").await.is_err());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.check_rate_limit("ip").await.is_ok());
    }

    #[test]
    fn test_client_ip_from_forwarded_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), "unknown");

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }
}
