use crate::api::models::*;
use crate::visit::{create_visitor_cookie, get_visitor_cookie};
use axum::{extract::State, Json};
use tower_cookies::Cookies;
use tracing::{debug, info};

/// Count a first-time visitor, or just report the count for a returning one
pub async fn visit_handler(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<VisitResponse>, AppError> {
    let count = match get_visitor_cookie(&cookies) {
        Some(_) => {
            let count = state.visit_service.get_current_count().await?;
            debug!(count, "Returning visitor");
            count
        }
        None => {
            let count = state.visit_service.increment_and_get_count().await?;
            cookies.add(create_visitor_cookie(&state.cookie_config));
            info!(count, "New visitor");
            count
        }
    };

    Ok(Json(VisitResponse { count }))
}
