mod api;
mod config;
mod storage;
mod visit;

use crate::api::{cors::CorsPolicy, AppState};
use crate::config::AppConfig;
use crate::storage::SqliteStore;
use crate::visit::VisitService;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("🚀 Starting Visit Counter API Server");

    // Load configuration
    let config = AppConfig::load()?;
    info!("📋 Configuration loaded");
    info!("   - Database: {}", config.storage.database_url);
    info!("   - Allowed origins: {:?}", config.cors.allowed_origins);
    info!("   - Cookie max age: {} days", config.cookie.max_age_days);
    info!("   - Server: {}:{}", config.server.host, config.server.port);

    // Initialize counter storage
    info!("💾 Initializing counter storage...");
    let store = SqliteStore::connect(&config.storage.database_url)
        .await
        .context("Failed to open counter database")?;
    store.health_check().await?;

    let visit_service = VisitService::new(store.clone());
    let current = visit_service.get_current_count().await?;
    info!("✅ Counter storage ready ({} visitors so far)", current);

    let cors = CorsPolicy::from_config(&config.cors)?;
    if config.cors.allowed_origins.is_empty() {
        info!("⚠️  No CORS origins configured, cross-origin requests will be refused");
    }

    let state = AppState {
        visit_service,
        cookie_config: Arc::new(config.cookie.clone()),
    };

    let app = api::app(state, cors);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📡 Available endpoints:");
    info!("   GET  /health           - Health check");
    info!("   GET  /visit            - Record and return visitor count");
    info!("");
    info!("✨ Server is ready to accept requests!");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("👋 Server shutting down gracefully");

    Ok(())
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}
