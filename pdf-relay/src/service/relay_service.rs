// pdf-relay/src/service/relay_service.rs

//! 共有リンク2件 → ダウンロード（並行）→ 結合 → base64 → メール送信
//!
//! どこかで失敗した時点で全体を中断する。メールは結合済みファイルが揃った場合のみ送る。

use serde_json::Value;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::document::{
    normalize_output_name, DeliveryPayload, FetchedDocument, MergeRequest,
};
use crate::domain::share_link::{resolve_resource_id, ResourceId};
use crate::error::{AppError, AppResult};
use crate::service::drive_service::DriveService;
use crate::service::email_service::EmailService;
use crate::service::merge_service::MergeService;
use crate::utils::error_helper::internal_server_error;

/// 結合・送信の依頼内容（入力検証済み）
#[derive(Debug, Clone)]
pub struct MergeEmailCommand {
    pub to_email: String,
    pub subject: String,
    pub html: String,
    pub link1: String,
    pub link2: String,
    pub output_name: Option<String>,
}

/// 結合・送信の結果
#[derive(Debug, Clone)]
pub struct MergeEmailOutcome {
    pub merged_bytes: usize,
    pub output_name: String,
    pub provider_response: Value,
}

pub struct RelayService {
    drive: DriveService,
    merge: MergeService,
    email: EmailService,
}

impl RelayService {
    pub fn new(drive: DriveService, merge: MergeService, email: EmailService) -> Self {
        Self {
            drive,
            merge,
            email,
        }
    }

    /// 設定から各クライアントを組み立てる
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let drive = DriveService::new(config.fetch.clone()).map_err(|e| {
            internal_server_error(e, "relay_service::from_config", "Failed to build HTTP client")
        })?;
        let merge = MergeService::new(config.merge.clone()).map_err(|e| {
            internal_server_error(e, "relay_service::from_config", "Failed to build HTTP client")
        })?;
        let email = EmailService::new(config.email.clone()).map_err(|e| {
            internal_server_error(e, "relay_service::from_config", "Invalid email configuration")
        })?;
        Ok(Self::new(drive, merge, email))
    }

    pub fn email(&self) -> &EmailService {
        &self.email
    }

    pub async fn merge_and_email(&self, command: MergeEmailCommand) -> AppResult<MergeEmailOutcome> {
        let (id1, id2) = resolve_links(&command.link1, &command.link2)?;
        self.email.ensure_configured()?;

        let (first, second) = tokio::try_join!(
            self.fetch_link("link1", &id1),
            self.fetch_link("link2", &id2),
        )?;

        let merged = self
            .merge
            .merge(MergeRequest::from_documents(vec![first, second]))
            .await?;

        let output_name = normalize_output_name(command.output_name.as_deref());
        let payload = DeliveryPayload::new(
            command.to_email,
            command.subject,
            command.html,
            output_name.clone(),
            &merged,
        );
        let provider_response = self.email.send(&payload).await?;

        info!(
            id1 = %id1,
            id2 = %id2,
            merged_bytes = merged.len(),
            output_name = %output_name,
            "Merged PDF delivered"
        );

        Ok(MergeEmailOutcome {
            merged_bytes: merged.len(),
            output_name,
            provider_response,
        })
    }

    async fn fetch_link(&self, link: &'static str, id: &ResourceId) -> AppResult<FetchedDocument> {
        self.drive.fetch(id).await.map_err(|source| {
            warn!(link = link, resource_id = %id, error = %source, "Download failed");
            AppError::Fetch { link, source }
        })
    }
}

/// 両方のリンクからIDが取れなければ、取れた方も含めて報告する
fn resolve_links(link1: &str, link2: &str) -> AppResult<(ResourceId, ResourceId)> {
    match (resolve_resource_id(link1), resolve_resource_id(link2)) {
        (Some(id1), Some(id2)) => Ok((id1, id2)),
        (id1, id2) => Err(AppError::LinkResolution {
            id1: id1.map(|id| id.as_str().to_string()),
            id2: id2.map(|id| id.as_str().to_string()),
        }),
    }
}
