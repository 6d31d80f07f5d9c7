// pdf-relay/src/api/handlers/relay_handler.rs
use crate::api::dto::relay_dto::{MergeEmailRequest, MergeEmailResponse};
use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::logging::RequestContext;
use crate::service::relay_service::MergeEmailCommand;
use crate::types::{ApiResponse, ResponseMeta};
use crate::utils::error_helper::{convert_validation_errors, missing_fields_error};
use axum::{
    extract::{rejection::JsonRejection, Extension, Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use tracing::info;
use validator::Validate;

/// 共有リンク2件のPDFを結合してメール送信する
pub async fn merge_and_email_handler(
    State(app_state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<MergeEmailRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    // 必須項目の欠落は外部呼び出しの前に弾く
    let missing = payload.missing_fields();
    if !missing.is_empty() {
        return Err(missing_fields_error(&missing, "relay_handler::merge_and_email"));
    }
    payload
        .validate()
        .map_err(|e| convert_validation_errors(e, "relay_handler::merge_and_email"))?;

    let command = MergeEmailCommand::try_from(payload)
        .map_err(|missing| missing_fields_error(&missing, "relay_handler::merge_and_email"))?;

    info!(
        request_id = %context.request_id,
        to_email = %command.to_email,
        "Merge and email requested"
    );

    let outcome = app_state.relay_service.merge_and_email(command).await?;

    Ok(
        ApiResponse::success("Merged PDF sent", MergeEmailResponse::from(outcome))
            .with_meta(ResponseMeta::with_request_id(context.request_id)),
    )
}

pub fn relay_router(app_state: AppState) -> Router {
    Router::new()
        .route("/merge-and-email", post(merge_and_email_handler))
        .with_state(app_state)
}
