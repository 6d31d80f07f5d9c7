// pdf-relay/src/main.rs
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pdf_relay::api::{create_app, AppState};
use pdf_relay::config::AppConfig;
use pdf_relay::service::relay_service::RelayService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 設定を読み込む（.env もここで読み込まれるので RUST_LOG より先）
    let app_config = AppConfig::from_env()?;

    // トレーシングの設定
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_relay=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Starting PDF relay server...");
    if app_config.is_development() {
        tracing::info!("Configuration loaded: {:?}", app_config);
    } else {
        tracing::info!(environment = %app_config.environment, "Configuration loaded");
    }

    let relay_service = Arc::new(RelayService::from_config(&app_config)?);
    if !relay_service.email().is_configured() {
        tracing::warn!("BREVO_API_KEY is not set; merge requests will be rejected");
    }

    let server_addr = app_config.server_addr();
    let app_state = AppState::new(relay_service, Arc::new(app_config));
    let app_router = create_app(app_state);

    let listener = TcpListener::bind(&server_addr).await?;
    tracing::info!("Router configured. Server listening on {}", server_addr);

    axum::serve(listener, app_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
