// pdf-relay/src/utils/error_helper.rs

//! エラーハンドリングの統一化ヘルパー
//!
//! サービス層とハンドラー層で共通して使用するエラー処理パターンを提供します。

use crate::error::AppError;
use tracing::{error, warn};
use validator::ValidationErrors;

// =============================================================================
// バリデーションエラー処理の統一
// =============================================================================

/// validatorのValidationErrorsをAppErrorに変換する統一処理
///
/// # Arguments
/// * `validation_errors` - validator crate からのバリデーションエラー
/// * `context` - エラーが発生したコンテキスト（ログ用）
pub fn convert_validation_errors(validation_errors: ValidationErrors, context: &str) -> AppError {
    warn!(
        context = %context,
        error_count = validation_errors.field_errors().len(),
        "Validation failed"
    );

    let mut errors: Vec<String> = validation_errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| "Invalid value".to_string(), |cow| cow.to_string());
                format!("{}: {}", field, message)
            })
        })
        .collect();
    errors.sort();

    AppError::ValidationErrors(errors)
}

/// 必須項目の欠落をまとめて1つのエラーにする
pub fn missing_fields_error(fields: &[&str], context: &str) -> AppError {
    warn!(
        context = %context,
        missing = ?fields,
        "Missing required fields"
    );

    AppError::ValidationErrors(
        fields
            .iter()
            .map(|field| format!("{}: is required", field))
            .collect(),
    )
}

// =============================================================================
// ログ付きエラー変換パターン
// =============================================================================

/// 内部サーバーエラーをログ付きで生成
///
/// # Arguments
/// * `error` - 元のエラー
/// * `context` - エラーが発生したコンテキスト
/// * `user_message` - ユーザーに表示するメッセージ
pub fn internal_server_error<E: std::fmt::Display>(
    error: E,
    context: &str,
    user_message: &str,
) -> AppError {
    error!(
        error = %error,
        context = %context,
        "Internal server error occurred"
    );
    AppError::InternalServerError(user_message.to_string())
}
