//! API Routes
//!
//! - `/api/tasks` - Task CRUD
//! - `/api/tasks/{id}/upload_image`, `/api/tasks/{id}/image_url` - Image attachments
//! - `/health` - Liveness check

pub mod extract;
pub mod health;
pub mod images;
pub mod tasks;

#[cfg(test)]
pub(crate) mod test_support;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
///
/// CORS applies to `/api/*` only; the body limit and request tracing apply
/// to everything.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let body_limit = state.config.server.max_content_length;
    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    let api_router = Router::new()
        .merge(tasks::router(state.clone()))
        .merge(images::router(state))
        .layer(cors);

    Router::new()
        .merge(api_router)
        .merge(health::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}
