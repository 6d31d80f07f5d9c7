// tests/common/app_helper.rs

use axum::Router;
use pdf_relay::{
    api::{create_app, AppState},
    config::AppConfig,
    service::relay_service::RelayService,
};
use std::sync::Arc;
use wiremock::MockServer;

use crate::common;

/// 外部サービス（ファイルホスト・結合エンジン・メール配信）のモック一式
pub struct TestUpstreams {
    pub drive: MockServer,
    pub merge: MockServer,
    pub email: MockServer,
}

impl TestUpstreams {
    pub async fn start() -> Self {
        common::init_test_env();
        Self {
            drive: MockServer::start().await,
            merge: MockServer::start().await,
            email: MockServer::start().await,
        }
    }

    /// モックを向いたテスト用設定
    pub fn config(&self) -> AppConfig {
        let mut config = AppConfig::for_testing();
        config.fetch.download_url = format!("{}/uc", self.drive.uri());
        config.merge.base_url = self.merge.uri();
        config.email.api_url = format!("{}/v3/smtp/email", self.email.uri());
        config
    }
}

/// 設定からアプリ全体を組み立てる
pub fn setup_app(config: AppConfig) -> Router {
    let relay_service = Arc::new(RelayService::from_config(&config).unwrap());
    create_app(AppState::new(relay_service, Arc::new(config)))
}
