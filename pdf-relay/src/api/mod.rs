// pdf-relay/src/api/mod.rs
use crate::config::AppConfig;
use crate::logging::{inject_request_context, logging_middleware};
use crate::service::relay_service::RelayService;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod dto;
pub mod handlers;

use handlers::relay_handler::relay_router;
use handlers::system_handler::system_router;

/// 統一されたアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub relay_service: Arc<RelayService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(relay_service: Arc<RelayService>, config: Arc<AppConfig>) -> Self {
        Self {
            relay_service,
            config,
        }
    }
}

/// ルーターとミドルウェアを組み立てる
pub fn create_app(app_state: AppState) -> Router {
    let body_limit = app_state.config.server.body_limit;
    let cors = cors_layer(app_state.config.server.cors_allowed_origins.as_deref());

    Router::new()
        .merge(relay_router(app_state))
        .merge(system_router())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(logging_middleware))
        .layer(axum::middleware::from_fn(inject_request_context))
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = allowed_origins else {
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
