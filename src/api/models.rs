use crate::config::CookieConfig;
use crate::storage::StoreError;
use crate::visit::VisitService;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub visit_service: VisitService,
    pub cookie_config: Arc<CookieConfig>,
}

/// Response from the visit endpoint
#[derive(Debug, Serialize)]
pub struct VisitResponse {
    pub count: i64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub total_visitors: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Storage(e) => {
                error!(error = %e, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse {
            error: status.to_string(),
            message: "Unable to process visit".to_string(),
        }))
        .into_response()
    }
}
