// pdf-relay/src/logging/mod.rs

//! リクエスト単位のログ
//!
//! `inject_request_context` がリクエストIDを決めてスパンを張るので、
//! ダウンロード・結合・メール送信のログにも同じ `request_id` が付く。

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 呼び出し側から受け取るリクエストIDの最大長
const MAX_REQUEST_ID_LEN: usize = 128;

// リクエストコンテキスト
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub path: String,
    pub method: String,
}

impl RequestContext {
    fn from_request(req: &Request<Body>) -> Self {
        // 呼び出し側が付けたIDがあれば引き継ぐ
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            request_id,
            path: req.uri().path().to_string(),
            method: req.method().to_string(),
        }
    }

    fn span(&self) -> Span {
        info_span!(
            "request",
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
        )
    }
}

/// 完了ログの重要度（5xx は error、4xx は warn）
fn log_completion(status: StatusCode, duration_ms: u64) {
    let status = status.as_u16();
    match status {
        500.. => tracing::error!(status, duration_ms, "Request completed"),
        400..=499 => tracing::warn!(status, duration_ms, "Request completed"),
        _ => tracing::info!(status, duration_ms, "Request completed"),
    }
}

// ロギングミドルウェア
pub async fn logging_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    tracing::info!("Request started");

    let response = next.run(req).await;
    log_completion(response.status(), start.elapsed().as_millis() as u64);
    response
}

// RequestContextを生成してスパンを張り、レスポンスに x-request-id を付与するミドルウェア
pub async fn inject_request_context(mut req: Request<Body>, next: Next) -> Response {
    let context = RequestContext::from_request(&req);
    let span = context.span();
    let request_id = context.request_id.clone();

    req.extensions_mut().insert(context);
    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}
