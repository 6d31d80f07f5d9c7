// pdf-relay/src/config.rs
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// 設定読み込みエラー
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub body_limit: usize,
    /// None の場合は全オリジンを許可
    pub cors_allowed_origins: Option<Vec<String>>,
}

/// ファイルホストからのダウンロード設定
#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub download_url: String,
    pub max_file_bytes: u64,
    pub timeout: Duration,
}

/// PDF結合エンジン（Gotenberg互換）の設定
#[derive(Clone, Debug)]
pub struct MergeConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl MergeConfig {
    pub fn merge_url(&self) -> String {
        format!("{}/forms/pdfengines/merge", self.base_url)
    }
}

/// メール配信プロバイダー（Brevo互換）の設定
#[derive(Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: String,
    pub timeout: Duration,
}

// APIキーをログに出さない
impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("sender_email", &self.sender_email)
            .field("sender_name", &self.sender_name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub merge: MergeConfig,
    pub email: EmailConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok(); // .env ファイルを読み込む (存在しなくてもエラーにしない)
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の変数ソースから設定を組み立てる
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |name: &str, default: &str| -> String {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let max_file_mb: f64 = parse_var(&lookup, "MAX_FILE_MB", 25.0)?;
        if !max_file_mb.is_finite() || max_file_mb <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_FILE_MB",
                value: max_file_mb.to_string(),
            });
        }

        let timeout_ms: u64 = parse_var(&lookup, "FETCH_TIMEOUT_MS", 60_000)?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "FETCH_TIMEOUT_MS",
                value: "0".to_string(),
            });
        }
        let timeout = Duration::from_millis(timeout_ms);

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty());

        Ok(Self {
            environment: var_or("ENVIRONMENT", "development"),
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var(&lookup, "PORT", 8080)?,
            server: ServerConfig {
                body_limit: parse_var(&lookup, "BODY_LIMIT_BYTES", 1024 * 1024)?,
                cors_allowed_origins,
            },
            fetch: FetchConfig {
                download_url: var_or("DRIVE_DOWNLOAD_URL", "https://drive.google.com/uc"),
                max_file_bytes: (max_file_mb * BYTES_PER_MB) as u64,
                timeout,
            },
            merge: MergeConfig {
                base_url: var_or("GOTENBERG_URL", "http://localhost:3000")
                    .trim_end_matches('/')
                    .to_string(),
                timeout,
            },
            email: EmailConfig {
                api_url: var_or("BREVO_API_URL", "https://api.brevo.com/v3/smtp/email"),
                api_key: var_or("BREVO_API_KEY", ""),
                sender_email: var_or("SENDER_EMAIL", "noreply@example.com"),
                sender_name: var_or("SENDER_NAME", "PDF Relay"),
                timeout,
            },
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// テスト用の設定を作成（外部サービスはローカルを向く）
    pub fn for_testing() -> Self {
        let timeout = Duration::from_secs(5);
        Self {
            environment: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            server: ServerConfig {
                body_limit: 1024 * 1024,
                cors_allowed_origins: None,
            },
            fetch: FetchConfig {
                download_url: "http://127.0.0.1:9/uc".to_string(),
                max_file_bytes: 25 * 1024 * 1024,
                timeout,
            },
            merge: MergeConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                timeout,
            },
            email: EmailConfig {
                api_url: "http://127.0.0.1:9/v3/smtp/email".to_string(),
                api_key: "test-api-key".to_string(),
                sender_email: "sender@example.com".to_string(),
                sender_name: "PDF Relay Test".to_string(),
                timeout,
            },
        }
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name).map(|v| v.trim().to_string()) {
        Some(value) if !value.is_empty() => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.fetch.max_file_bytes, 25 * 1024 * 1024);
        assert_eq!(config.fetch.timeout, Duration::from_millis(60_000));
        assert_eq!(config.fetch.download_url, "https://drive.google.com/uc");
        assert_eq!(
            config.merge.merge_url(),
            "http://localhost:3000/forms/pdfengines/merge"
        );
        assert_eq!(config.email.api_url, "https://api.brevo.com/v3/smtp/email");
        assert!(config.email.api_key.is_empty());
        assert!(config.server.cors_allowed_origins.is_none());
        assert!(config.is_development());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("MAX_FILE_MB", "1.5"),
            ("FETCH_TIMEOUT_MS", "2500"),
            ("GOTENBERG_URL", "http://gotenberg:3000/"),
            ("BREVO_API_KEY", "secret"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("PORT", "9000"),
        ])
        .unwrap();

        assert_eq!(config.fetch.max_file_bytes, 1_572_864);
        assert_eq!(config.email.timeout, Duration::from_millis(2500));
        assert_eq!(
            config.merge.merge_url(),
            "http://gotenberg:3000/forms/pdfengines/merge"
        );
        assert_eq!(config.port, 9000);
        assert_eq!(
            config.server.cors_allowed_origins,
            Some(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert_eq!(
            config_from(&[("MAX_FILE_MB", "lots")]).unwrap_err(),
            ConfigError::InvalidValue {
                name: "MAX_FILE_MB",
                value: "lots".to_string()
            }
        );
        assert!(config_from(&[("MAX_FILE_MB", "-1")]).is_err());
        assert!(config_from(&[("FETCH_TIMEOUT_MS", "0")]).is_err());
        assert!(config_from(&[("PORT", "99999")]).is_err());
    }

    #[test]
    fn test_api_key_is_redacted_in_debug() {
        let config = config_from(&[("BREVO_API_KEY", "super-secret")]).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("***"));
    }
}
