use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ev_service_center::cache::{CacheOperations, MemoryCache, RedisClient};
use ev_service_center::config::environment::EnvironmentConfig;
use ev_service_center::database::DatabaseConnection;
use ev_service_center::services::{EmailService, Metrics, Scheduler};
use ev_service_center::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("⚡ EV Service Center API v{}", env!("CARGO_PKG_VERSION"));

    let config = EnvironmentConfig::from_env().context("invalid configuration")?;

    // Inicializar base de datos
    let db = DatabaseConnection::new(&config.database).await?;
    db.run_migrations().await?;
    let pool = db.pool().clone();

    // Redis, o cache en memoria si no está disponible
    let cache: Arc<dyn CacheOperations> = match RedisClient::new(&config.cache).await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!("⚠️ Redis unavailable ({}), falling back to in-memory cache", e);
            Arc::new(MemoryCache::new())
        }
    };

    let email = match EmailService::new(config.smtp.as_ref()) {
        Ok(service) => service,
        Err(e) => {
            warn!("⚠️ SMTP misconfigured ({}), emails disabled", e);
            EmailService::disabled()
        }
    };

    let metrics = Arc::new(Metrics::new().context("could not register metrics")?);
    Scheduler::new(pool.clone(), Arc::clone(&metrics), config.scheduler_interval_secs).start();

    let addr: SocketAddr = config
        .server_url()
        .parse()
        .context("HOST/PORT do not form a socket address")?;
    let environment = config.environment.clone();

    let state = AppState::new(pool, config, cache, email, metrics);
    let app = create_router(state);

    info!("🌐 Listening on http://{} ({})", addr, environment);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Server error: {}", e);
        return Err(e.into());
    }

    info!("👋 Server stopped");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Could not install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Could not install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Ctrl+C received, shutting down...");
        },
        _ = terminate => {
            info!("🛑 SIGTERM received, shutting down...");
        },
    }
}
