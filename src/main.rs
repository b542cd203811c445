//! Credit Scoring API - Main Entry Point
//!
//! Loads the trained pipeline once and serves default predictions over HTTP.

use anyhow::{Context, Result};
use credit_scoring::{
    config::AppConfig,
    metrics::MetricsReporter,
    models::ModelLoader,
    server::{build_router, shutdown_signal, AppState},
    telemetry::init_logging,
};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Credit Scoring API");
    info!(
        threshold = config.server.threshold,
        medium = config.server.risk_levels.medium,
        high = config.server.risk_levels.high,
        critical = config.server.risk_levels.critical,
        "Decision settings"
    );

    // Fail fast: the service is useless without a model
    let artifact = ModelLoader::load(&config.model.model_path)?;
    let state = AppState::new(artifact, &config.server);

    let reporter = MetricsReporter::new(state.metrics.clone(), config.server.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let bind_addr = config.server.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!(addr = %bind_addr, "Listening");

    let metrics = state.metrics.clone();
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Credit Scoring API shutting down");
    metrics.log_summary();
    Ok(())
}
