use crate::api::models::AppState;
use crate::api::visit::handlers::visit_handler;
use axum::{routing::get, Router};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/visit", get(visit_handler))
}
