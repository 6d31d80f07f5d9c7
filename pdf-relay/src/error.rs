// pdf-relay/src/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};

use crate::service::drive_service::FetchError;
use crate::service::email_service::DeliveryError;
use crate::service::merge_service::MergeError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Multiple validation errors")]
    ValidationErrors(Vec<String>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Could not extract file ids from the share links")]
    LinkResolution {
        id1: Option<String>,
        id2: Option<String>,
    },

    #[error("Failed to fetch {link}: {source}")]
    Fetch {
        link: &'static str,
        #[source]
        source: FetchError,
    },

    #[error("{0}")]
    Merge(#[from] MergeError),

    #[error("{0}")]
    Delivery(#[from] DeliveryError),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

// axum でエラーをHTTPレスポンスに変換するための実装
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            AppError::ValidationErrors(errors) => {
                let mut field_errors = HashMap::new();
                for error in &errors {
                    if let Some((field, message)) = error.split_once(": ") {
                        field_errors
                            .entry(field.to_string())
                            .or_insert_with(Vec::new)
                            .push(message.to_string());
                    }
                }
                let errors_array: Vec<serde_json::Value> =
                    errors.iter().map(|e| json!({"message": e})).collect();
                let mut response = ErrorResponse::new(
                    format!("Validation failed: {}", errors.join("; ")),
                    "validation_errors",
                );
                response.validation_errors = Some(field_errors);
                response.errors = Some(errors_array);
                (StatusCode::BAD_REQUEST, response)
            }
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(message, "bad_request"),
            ),
            AppError::LinkResolution { id1, id2 } => {
                warn!(id1 = ?id1, id2 = ?id2, "Share link resolution failed");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new(
                        "Could not extract file ids from the share links",
                        "invalid_share_link",
                    )
                        .with_details(json!({ "id1": id1, "id2": id2 })),
                )
            }
            AppError::Fetch { link, source } => {
                let status = match source {
                    FetchError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    FetchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::BAD_GATEWAY,
                };
                let message = format!("Failed to fetch {}: {}", link, source);
                error!(link = link, error = %source, "Fetch error");
                (
                    status,
                    ErrorResponse::new(message, "fetch_error")
                        .with_details(json!({ "link": link })),
                )
            }
            AppError::Merge(err) => {
                error!(error = %err, "Merge service error");
                let status = match err {
                    MergeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, ErrorResponse::new(err.to_string(), "merge_error"))
            }
            AppError::Delivery(err) => {
                error!(error = %err, "Email delivery error");
                let status = match err {
                    DeliveryError::MissingConfiguration(_) => StatusCode::SERVICE_UNAVAILABLE,
                    DeliveryError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, ErrorResponse::new(err.to_string(), "delivery_error"))
            }
            AppError::InternalServerError(message) => {
                error!("Internal server error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "An internal server error occurred",
                        "internal_server_error",
                    ),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

// Result 型のエイリアス
pub type AppResult<T> = Result<T, AppError>;

/// 統一的なエラーレスポンス構造
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<HashMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<serde_json::Value>>,
    pub error_type: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, error_type: &str) -> Self {
        let message = message.into();
        Self {
            success: false,
            error: message.clone(),
            message,
            details: None,
            validation_errors: None,
            errors: None,
            error_type: error_type.to_string(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
