use axum::{Router, routing::get, Json};
use crate::types::HealthResponse;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_check))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}
