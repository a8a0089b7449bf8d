//! Credit Risk Scoring Service - Main Entry Point
//!
//! Resolves the model artifacts (fetching them once if configured), loads
//! them into an immutable scoring engine and serves `POST /predict`.

use anyhow::{Context, Result};
use credit_risk_service::{
    build_router, config::AppConfig, logging,
    metrics::{MetricsReporter, ServiceMetrics},
    AppState, ArtifactStore, EncodingPolicy, ScoringEngine,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.logging)?;

    info!("Starting Credit Risk Scoring Service");
    info!(
        listen_addr = %config.server.listen_addr,
        cache_dir = %config.artifacts.cache_dir.display(),
        remote_enabled = config.remote.enabled,
        remote_backend = ?config.remote.backend,
        encoding = ?config.features.encoding,
        "Configuration loaded"
    );

    // Artifacts must be local before anything is served
    let store = ArtifactStore::from_config(&config).await?;
    let paths = store
        .ensure_local()
        .await
        .context("Failed to resolve model artifacts")?;

    let engine = ScoringEngine::load(paths, config.features.encoding)
        .context("Failed to load model artifacts")?;
    for issue in engine.consistency_issues() {
        warn!(issue = %issue, "Artifact shapes disagree; requests will fail");
    }
    if engine.policy() == EncodingPolicy::DropFirst {
        info!("drop_first encoding active: single-record categorical fields are discarded");
    }

    let metrics = Arc::new(ServiceMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = Arc::new(AppState::new(engine, metrics.clone()));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
    info!(listen_addr = %config.server.listen_addr, "Serving POST /predict");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Service shutting down...");
    metrics.log_summary();

    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
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
}
