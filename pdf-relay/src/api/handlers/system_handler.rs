// pdf-relay/src/api/handlers/system_handler.rs
use axum::{routing::get, Router};

use crate::api::dto::relay_dto::HealthResponse;
use crate::types::ApiResponse;

/// 死活監視用（常に200）
pub async fn health_handler() -> ApiResponse<HealthResponse> {
    ApiResponse::success(
        "ok",
        HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    )
}

pub fn system_router() -> Router {
    Router::new().route("/health", get(health_handler))
}
