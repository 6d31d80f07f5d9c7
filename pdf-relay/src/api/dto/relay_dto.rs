// pdf-relay/src/api/dto/relay_dto.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::service::relay_service::{MergeEmailCommand, MergeEmailOutcome};

// --- リクエストDTO ---

/// 結合・送信リクエスト
///
/// 欠落を自前で検出して一括で報告するため、必須項目も `Option` で受ける。
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MergeEmailRequest {
    #[validate(email(message = "Invalid email format"))]
    pub to_email: Option<String>,

    #[validate(length(max = 998, message = "Subject must be 998 characters or less"))]
    pub subject: Option<String>,

    pub html: Option<String>,

    pub link1: Option<String>,

    pub link2: Option<String>,

    #[validate(length(max = 255, message = "Output name must be 255 characters or less"))]
    pub output_name: Option<String>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl MergeEmailRequest {
    /// 欠落または空白のみの必須項目名
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("toEmail", &self.to_email),
            ("subject", &self.subject),
            ("html", &self.html),
            ("link1", &self.link1),
            ("link2", &self.link2),
        ]
        .into_iter()
        .filter(|(_, value)| !present(value))
        .map(|(name, _)| name)
        .collect()
    }
}

impl TryFrom<MergeEmailRequest> for MergeEmailCommand {
    type Error = Vec<&'static str>;

    fn try_from(request: MergeEmailRequest) -> Result<Self, Self::Error> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(MergeEmailCommand {
            to_email: request.to_email.unwrap_or_default().trim().to_string(),
            subject: request.subject.unwrap_or_default(),
            html: request.html.unwrap_or_default(),
            link1: request.link1.unwrap_or_default(),
            link2: request.link2.unwrap_or_default(),
            output_name: request.output_name,
        })
    }
}

// --- レスポンスDTO ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeEmailResponse {
    pub merged_bytes: usize,
    pub output_name: String,
    /// メール配信プロバイダーの応答（加工しない）
    pub provider: Value,
}

impl From<MergeEmailOutcome> for MergeEmailResponse {
    fn from(outcome: MergeEmailOutcome) -> Self {
        Self {
            merged_bytes: outcome.merged_bytes,
            output_name: outcome.output_name,
            provider: outcome.provider_response,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
