pub mod cors;
pub mod models;
pub mod visit;

// Re-exports
pub use models::*;

use axum::{extract::State, routing::get, Json, Router};
use cors::CorsPolicy;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

pub async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let total_visitors = state.visit_service.get_current_count().await?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        total_visitors,
    }))
}

/// Full application router
pub fn app(state: AppState, cors: CorsPolicy) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .merge(visit::routes())
        .with_state(state)
        .layer(CookieManagerLayer::new());

    cors.apply(router).layer(TraceLayer::new_for_http())
}
