mod alert_store;
mod api;
mod config;
mod notifier;
mod resolution;
mod video_fetcher;

use alert_store::PgAlertStore;
use anyhow::{Context, Result};
use api::{start_api_server, AppState};
use config::Config;
use notifier::LogNotifier;
use resolution::FfprobeExtractor;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use video_fetcher::HttpVideoFetcher;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        "Starting Alert Service"
    );

    // Initialize metrics
    init_metrics(config.service.metrics_port)?;

    // Initialize components
    let store = Arc::new(
        PgAlertStore::new(&config.database)
            .await
            .context("Failed to initialize alert store")?,
    );

    // Run migrations if enabled
    if config.database.run_migrations {
        store
            .run_migrations()
            .await
            .context("Failed to run database migrations")?;
    }

    let fetcher = Arc::new(
        HttpVideoFetcher::new(&config.video_server)
            .context("Failed to initialize video fetcher")?,
    );

    // Create API state
    let state = AppState {
        fetcher,
        extractor: Arc::new(FfprobeExtractor::new()),
        store,
        notifier: Arc::new(LogNotifier),
    };

    // Spawn API server task
    let http_config = config.http.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = start_api_server(state, &http_config).await {
            error!(error = %e, "API server error");
        }
    });

    info!("Alert service started successfully");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down alert service");

    api_handle.abort();

    info!("Alert service stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
