use axum::Json;
use gavel_shared::types::api::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("gavel-bot", env!("CARGO_PKG_VERSION")))
}
