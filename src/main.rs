//! OCR Search Server
//!
//! Indexes OCR text into a search store and answers IIIF content search
//! queries with word-level page coordinates.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocr_search_server::config::{Config, StoreConfig};
use ocr_search_server::routes;
use ocr_search_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_search_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    // Invalid values abort startup
    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Starting OCR Search Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("OCR format: {}", config.ocr.format);
    tracing::info!("OCR directory: {}", config.ocr.xml_dir.display());
    match &config.store {
        StoreConfig::Solr {
            url,
            core,
            update_format,
        } => tracing::info!("Solr core: {}/{} ({} updates)", url, core, update_format),
        StoreConfig::Memory => tracing::warn!("Using in-memory store, index is not persisted"),
    }
    if !config.ip_whitelist.is_empty() {
        tracing::info!("IP whitelist: {:?}", config.ip_whitelist);
    }

    let host = config.server.host.clone();
    let port = config.server.port;
    let app_state = AppState::new(config);

    let app = routes::app(app_state).layer(TraceLayer::new_for_http());

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    tracing::info!("OCR Search Server listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
