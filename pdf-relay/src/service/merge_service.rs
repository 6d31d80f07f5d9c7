// pdf-relay/src/service/merge_service.rs

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::MergeConfig;
use crate::domain::document::{MergeRequest, PDF_CONTENT_TYPE};

/// エラーメッセージに含める本文の最大文字数
const MAX_ERROR_BODY_CHARS: usize = 500;

/// multipart のフィールド名（全パート共通）
const FILES_FIELD: &str = "files";

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Merge service returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Merge service returned an empty document")]
    EmptyResult,

    #[error("Timed out waiting for merge service: {0}")]
    Timeout(String),

    #[error("Failed to call merge service: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for MergeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MergeError::Timeout(err.to_string())
        } else {
            MergeError::Transport(err.to_string())
        }
    }
}

/// PDF結合エンジンのクライアント
#[derive(Clone)]
pub struct MergeService {
    client: Client,
    config: MergeConfig,
}

impl MergeService {
    pub fn new(config: MergeConfig) -> Result<Self, MergeError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// パート順に結合したPDFを返す
    pub async fn merge(&self, request: MergeRequest) -> Result<Vec<u8>, MergeError> {
        let part_count = request.parts.len();
        let mut form = Form::new();
        for part in request.parts {
            let file = Part::bytes(part.bytes)
                .file_name(part.filename)
                .mime_str(PDF_CONTENT_TYPE)?;
            form = form.part(FILES_FIELD, file);
        }

        let response = self
            .client
            .post(self.config.merge_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Merge service rejected request");
            return Err(MergeError::UpstreamStatus {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let merged = response.bytes().await?.to_vec();
        if merged.is_empty() {
            return Err(MergeError::EmptyResult);
        }

        info!(parts = part_count, bytes = merged.len(), "Merged PDFs");
        Ok(merged)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &trimmed[..index]),
        None => trimmed.to_string(),
    }
}
