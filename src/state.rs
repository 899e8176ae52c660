//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use reqwest::Client;
use sqlx::PgPool;

use crate::cache::CacheOperations;
use crate::config::environment::EnvironmentConfig;
use crate::middleware::rate_limit::RateLimitState;
use crate::services::{AuthService, ChatHub, EmailService, Metrics, VnpayService};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<EnvironmentConfig>,
    pub cache: Arc<dyn CacheOperations>,
    pub email: Arc<EmailService>,
    pub chat: ChatHub,
    pub metrics: Arc<Metrics>,
    pub http_client: Client,
    pub rate_limit: RateLimitState,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: EnvironmentConfig,
        cache: Arc<dyn CacheOperations>,
        email: EmailService,
        metrics: Arc<Metrics>,
    ) -> Self {
        let rate_limit = RateLimitState::new(&config);
        Self {
            pool,
            config: Arc::new(config),
            cache,
            email: Arc::new(email),
            chat: ChatHub::new(),
            metrics,
            http_client: Client::new(),
            rate_limit,
        }
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(
            Arc::clone(&self.cache),
            self.config.cache.clone(),
            self.config.jwt.clone(),
        )
    }

    pub fn vnpay_service(&self) -> VnpayService {
        VnpayService::new(self.config.vnpay.clone(), self.http_client.clone())
    }
}
