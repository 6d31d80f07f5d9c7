// pdf-relay/src/service/email_service.rs

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};
use validator::ValidateEmail;

use crate::config::EmailConfig;
use crate::domain::document::DeliveryPayload;

/// メール送信エラー
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Missing email configuration: {0}")]
    MissingConfiguration(&'static str),

    #[error("Invalid sender address: {0}")]
    InvalidSender(String),

    #[error("Email provider returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Timed out sending email: {0}")]
    Timeout(String),

    #[error("Failed to send email: {0}")]
    SendError(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DeliveryError::Timeout(err.to_string())
        } else {
            DeliveryError::SendError(err.to_string())
        }
    }
}

// --- Brevo transactional email API のリクエスト形式 ---

#[derive(Debug, Serialize)]
struct Contact<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Attachment<'a> {
    name: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
    sender: Contact<'a>,
    to: Vec<Contact<'a>>,
    subject: &'a str,
    html_content: &'a str,
    attachment: Vec<Attachment<'a>>,
}

/// メール送信サービス
#[derive(Clone)]
pub struct EmailService {
    client: Client,
    config: EmailConfig,
}

impl EmailService {
    /// 新しいEmailServiceを作成
    pub fn new(config: EmailConfig) -> Result<Self, DeliveryError> {
        if !config.sender_email.validate_email() {
            return Err(DeliveryError::InvalidSender(config.sender_email.clone()));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    /// 送信前の設定確認
    pub fn ensure_configured(&self) -> Result<(), DeliveryError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(DeliveryError::MissingConfiguration("BREVO_API_KEY"))
        }
    }

    /// 添付付きメールを送信し、プロバイダーの応答をそのまま返す
    pub async fn send(&self, payload: &DeliveryPayload) -> Result<Value, DeliveryError> {
        // 宛先の形式はリクエスト受付時に検証済み
        self.ensure_configured()?;

        let request = build_request(&self.config, payload);
        let response = self
            .client
            .post(&self.config.api_url)
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(
                status = status.as_u16(),
                to_email = %payload.to_email,
                "Email provider rejected message"
            );
            return Err(DeliveryError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            to_email = %payload.to_email,
            subject = %payload.subject,
            attachment = %payload.attachment_name,
            "Email sent successfully"
        );

        Ok(parse_provider_response(&body))
    }
}

fn build_request<'a>(config: &'a EmailConfig, payload: &'a DeliveryPayload) -> SendEmailRequest<'a> {
    SendEmailRequest {
        sender: Contact {
            email: &config.sender_email,
            name: Some(&config.sender_name).filter(|name| !name.is_empty()).map(String::as_str),
        },
        to: vec![Contact {
            email: &payload.to_email,
            name: None,
        }],
        subject: &payload.subject,
        html_content: &payload.html_body,
        attachment: vec![Attachment {
            name: &payload.attachment_name,
            content: &payload.attachment_base64,
        }],
    }
}

/// 空またはJSONでない応答は `{}` として扱う
fn parse_provider_response(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Default::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let config = AppConfig::for_testing().email;
        let payload = DeliveryPayload::new(
            "to@example.com",
            "Merged",
            "<p>Here you go</p>",
            "merged.pdf",
            b"%PDF",
        );

        let value = serde_json::to_value(build_request(&config, &payload)).unwrap();
        assert_eq!(
            value,
            json!({
                "sender": { "email": "sender@example.com", "name": "PDF Relay Test" },
                "to": [{ "email": "to@example.com" }],
                "subject": "Merged",
                "htmlContent": "<p>Here you go</p>",
                "attachment": [{ "name": "merged.pdf", "content": "JVBERg==" }]
            })
        );
    }

    #[test]
    fn test_parse_provider_response() {
        assert_eq!(
            parse_provider_response(r#"{"messageId":"<abc@smtp-relay>"}"#),
            json!({ "messageId": "<abc@smtp-relay>" })
        );
        assert_eq!(parse_provider_response(""), json!({}));
        assert_eq!(parse_provider_response("accepted"), json!({}));
    }

    #[test]
    fn test_missing_api_key() {
        let mut config = AppConfig::for_testing().email;
        config.api_key.clear();
        let service = EmailService::new(config).unwrap();

        assert!(!service.is_configured());
        assert!(matches!(
            service.ensure_configured(),
            Err(DeliveryError::MissingConfiguration("BREVO_API_KEY"))
        ));
    }

    #[test]
    fn test_invalid_sender_is_rejected() {
        let mut config = AppConfig::for_testing().email;
        config.sender_email = "not-an-email".to_string();
        assert!(matches!(
            EmailService::new(config),
            Err(DeliveryError::InvalidSender(_))
        ));
    }
}
