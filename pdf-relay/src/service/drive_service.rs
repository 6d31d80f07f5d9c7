// pdf-relay/src/service/drive_service.rs

//! ファイルホストからのPDFダウンロード
//!
//! 大きなファイルは直接ダウンロードできず、確認トークン入りのHTMLページが返る。
//! その場合はトークンとセッションCookieを付けてもう一度だけ取得する。

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::domain::document::{is_pdf_content_type, FetchedDocument, Megabytes};
use crate::domain::share_link::ResourceId;

const MAX_REDIRECTS: usize = 10;

static CONFIRM_QUERY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"confirm=([0-9A-Za-z_-]+)").expect("Invalid confirm regex"));
static CONFIRM_INPUT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"name="confirm"\s+value="([0-9A-Za-z_-]+)""#).expect("Invalid confirm regex")
});

/// ダウンロードエラー
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid download URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("File too large ({size} MB, limit {limit} MB)")]
    TooLarge { size: Megabytes, limit: Megabytes },

    #[error("Not a PDF and no confirmation token found (content-type: {content_type})")]
    MissingConfirmToken { content_type: String },

    #[error("Not a PDF after confirmation (content-type: {content_type})")]
    UnexpectedContentType { content_type: String },

    #[error("File host returned status {status}")]
    UpstreamStatus { status: u16 },

    #[error("Timed out downloading file: {0}")]
    Timeout(String),

    #[error("Failed to download file: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// 1回目のレスポンスで受け取ったセッションCookie（`name=value` の列）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCookies(Vec<String>);

impl SessionCookies {
    /// `Set-Cookie` ヘッダー群から name=value 部分だけを取り出す
    pub fn from_set_cookie_headers<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let pairs = values
            .into_iter()
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| pair.contains('=') && !pair.starts_with('='))
            .map(str::to_string)
            .collect();
        Self(pairs)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Cookie` リクエストヘッダーの値
    pub fn header_value(&self) -> Option<String> {
        (!self.0.is_empty()).then(|| self.0.join("; "))
    }
}

/// 受信済みレスポンス（本文はサイズ上限内で読み込み済み）
#[derive(Debug, Clone)]
pub struct DownloadResponse {
    pub content_type: String,
    pub cookies: SessionCookies,
    pub body: Vec<u8>,
}

/// 1回目のレスポンスを見た結果
#[derive(Debug, Clone, PartialEq)]
pub enum FetchStep {
    /// そのままPDFが返ってきた
    Direct(FetchedDocument),
    /// 確認ページだったので、トークン付きで再取得する
    Confirm {
        token: String,
        cookies: SessionCookies,
    },
}

/// 確認ページのHTMLからトークンを探す
pub fn find_confirm_token(html: &str) -> Option<String> {
    CONFIRM_QUERY_REGEX
        .captures(html)
        .or_else(|| CONFIRM_INPUT_REGEX.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// 1回目のレスポンスを判定する
pub fn inspect_first_response(response: DownloadResponse) -> Result<FetchStep, FetchError> {
    if is_pdf_content_type(&response.content_type) {
        return Ok(FetchStep::Direct(FetchedDocument {
            bytes: response.body,
            content_type: response.content_type,
        }));
    }

    let html = String::from_utf8_lossy(&response.body);
    match find_confirm_token(&html) {
        Some(token) => Ok(FetchStep::Confirm {
            token,
            cookies: response.cookies,
        }),
        None => Err(FetchError::MissingConfirmToken {
            content_type: response.content_type,
        }),
    }
}

/// 確認後のレスポンスを判定する
pub fn inspect_confirmed_response(
    response: DownloadResponse,
) -> Result<FetchedDocument, FetchError> {
    if is_pdf_content_type(&response.content_type) {
        Ok(FetchedDocument {
            bytes: response.body,
            content_type: response.content_type,
        })
    } else {
        Err(FetchError::UnexpectedContentType {
            content_type: response.content_type,
        })
    }
}

/// ファイルホストのダウンロードクライアント
#[derive(Clone)]
pub struct DriveService {
    client: Client,
    config: FetchConfig,
}

impl DriveService {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// ファイルIDからPDFを取得する
    pub async fn fetch(&self, id: &ResourceId) -> Result<FetchedDocument, FetchError> {
        let url = id.download_url(&self.config.download_url, None)?;
        let first = self.download(url, &SessionCookies::default()).await?;

        let document = match inspect_first_response(first)? {
            FetchStep::Direct(document) => document,
            FetchStep::Confirm { token, cookies } => {
                info!(
                    resource_id = %id,
                    cookie_count = cookies.0.len(),
                    "Large file interstitial detected, retrying with confirmation token"
                );
                self.fetch_confirmed(id, &token, &cookies).await?
            }
        };

        info!(
            resource_id = %id,
            bytes = document.bytes.len(),
            "Downloaded PDF"
        );
        Ok(document)
    }

    async fn fetch_confirmed(
        &self,
        id: &ResourceId,
        token: &str,
        cookies: &SessionCookies,
    ) -> Result<FetchedDocument, FetchError> {
        let url = id.download_url(&self.config.download_url, Some(token))?;
        let response = self.download(url, cookies).await?;
        inspect_confirmed_response(response).inspect_err(|e| {
            warn!(resource_id = %id, error = %e, "Confirmed download is not a PDF");
        })
    }

    async fn download(
        &self,
        url: Url,
        cookies: &SessionCookies,
    ) -> Result<DownloadResponse, FetchError> {
        debug!(url = %url, "GET file host");

        let mut request = self.client.get(url);
        if let Some(cookie) = cookies.header_value() {
            request = request.header(COOKIE, cookie);
        }
        let response = request.send().await?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(FetchError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let cookies = SessionCookies::from_set_cookie_headers(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );

        let body = self.read_body(response).await?;
        Ok(DownloadResponse {
            content_type,
            cookies,
            body,
        })
    }

    /// 宣言サイズで先に弾き、宣言がなければ上限を超えた時点で読み込みを打ち切る
    ///
    /// 打ち切った場合に報告するサイズはそこまでに受信したバイト数。
    async fn read_body(&self, mut response: Response) -> Result<Vec<u8>, FetchError> {
        let limit = self.config.max_file_bytes;

        let declared = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let Some(declared) = declared.filter(|len| *len > limit) {
            return Err(self.too_large(declared));
        }

        let mut body = Vec::with_capacity(declared.unwrap_or(0) as usize);
        while let Some(chunk) = response.chunk().await? {
            let received = body.len() as u64 + chunk.len() as u64;
            if received > limit {
                return Err(self.too_large(received));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn too_large(&self, size: u64) -> FetchError {
        FetchError::TooLarge {
            size: Megabytes(size),
            limit: Megabytes(self.config.max_file_bytes),
        }
    }
}
