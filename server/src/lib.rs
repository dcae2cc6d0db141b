//! Smart Confidant — HTTP-сервер чата: маршруты, монитор ресурсов, запуск.

pub mod commands;
pub mod config;
pub mod state;
pub mod ui;

use axum::routing::{get, post};
use axum::Router;
use backend_core::{spawn_monitor, DEFAULT_POLL_INTERVAL};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let assets = ServeDir::new(state.config.assets_dir.clone());
    Router::new()
        .route("/", get(commands::index))
        .route("/health", get(commands::health))
        .route("/api/config", get(commands::ui_config))
        .route("/api/chat", post(commands::chat))
        .route("/api/logs", get(commands::logs))
        .route("/api/local_models", get(commands::local_models))
        .nest_service("/assets", assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Запуск сервера: баннер, монитор ресурсов, HTTP до сигнала остановки.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let bind = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config)?;
    let log = state.log.clone();

    let banner = "=".repeat(40);
    log.info(banner.as_str());
    log.info("Smart Confidant Starting");
    log.info(format!(
        "HF_TOKEN: {}",
        if state.config.has_token() { "Yes" } else { "No" }
    ));
    log.info(format!("Models: {}", state.router.models().len()));
    log.info(banner.as_str());

    let monitor = spawn_monitor(log.clone(), DEFAULT_POLL_INTERVAL);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    let addr = listener.local_addr()?;
    info!("listening on http://{}", addr);
    log.info(format!("Server listening on port {}", addr.port()));

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    monitor.abort();
    if let Err(ref e) = served {
        error!("http server exited with error: {e}");
    }
    log.info("Smart Confidant stopped");
    served.map_err(Into::into)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}
