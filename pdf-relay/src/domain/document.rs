// pdf-relay/src/domain/document.rs

use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const DEFAULT_OUTPUT_NAME: &str = "merged.pdf";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Content-Type が PDF かどうか（パラメータと大文字小文字は無視）
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
        .unwrap_or(false)
}

/// バイト数のMB表記（小数第1位）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Megabytes(pub u64);

impl fmt::Display for Megabytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0 as f64 / BYTES_PER_MB)
    }
}

/// ダウンロード済みのファイル
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// 結合エンジンへ送る1パート
#[derive(Debug, Clone, PartialEq)]
pub struct MergePart {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 結合リクエスト（パートの順序がそのまま結合順になる）
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRequest {
    pub parts: Vec<MergePart>,
}

impl MergeRequest {
    /// 位置に応じて `1.pdf`, `2.pdf`, ... のファイル名を付ける
    pub fn from_documents(documents: Vec<FetchedDocument>) -> Self {
        let parts = documents
            .into_iter()
            .enumerate()
            .map(|(index, document)| MergePart {
                filename: format!("{}.pdf", index + 1),
                bytes: document.bytes,
            })
            .collect();
        Self { parts }
    }
}

/// メール送信内容（添付はbase64済み）
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryPayload {
    pub to_email: String,
    pub subject: String,
    pub html_body: String,
    pub attachment_name: String,
    pub attachment_base64: String,
}

impl DeliveryPayload {
    pub fn new(
        to_email: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
        attachment_name: impl Into<String>,
        attachment: &[u8],
    ) -> Self {
        Self {
            to_email: to_email.into(),
            subject: subject.into(),
            html_body: html_body.into(),
            attachment_name: attachment_name.into(),
            attachment_base64: STANDARD.encode(attachment),
        }
    }
}

/// 出力ファイル名を正規化する
///
/// 空ならデフォルト名、パス区切りは除去、拡張子 `.pdf` を保証する。
pub fn normalize_output_name(name: Option<&str>) -> String {
    let cleaned: String = name
        .unwrap_or_default()
        .chars()
        .filter(|c| !matches!(c, '/' | '\\') && !c.is_control())
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return DEFAULT_OUTPUT_NAME.to_string();
    }

    if cleaned.to_ascii_lowercase().ends_with(".pdf") {
        cleaned.to_string()
    } else {
        format!("{}.pdf", cleaned)
    }
}
