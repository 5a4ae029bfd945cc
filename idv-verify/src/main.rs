//! idv-verify - identity correlation and face verification service
//!
//! Loads a batch of identities, ranks each identity's online candidates by
//! attribute agreement and verifies them one at a time against a remote face
//! comparison service. Progress is exposed over HTTP REST + SSE.

use anyhow::{Context, Result};
use clap::Parser;
use idv_common::events::EventBus;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use idv_verify::config::{self, Args};
use idv_verify::provider::{DataProvider, JsonFileProvider};
use idv_verify::services::{
    HttpFaceComparator, SessionStore, VerificationOrchestrator, VerificationSettings,
};
use idv_verify::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.write_config {
        init_tracing("info");
        config::write_resolved(&args, path)?;
        return Ok(());
    }

    let resolved = config::resolve(&args)?;
    init_tracing(&resolved.toml.logging.level);

    info!(
        "Starting IDV verification service (idv-verify) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let dataset = JsonFileProvider::new(&resolved.data_file)
        .load()
        .with_context(|| format!("Failed to load identity data from {}", resolved.data_file.display()))?;
    if dataset.is_empty() {
        tracing::warn!("Identity data contains no identities");
    }

    let comparison = &resolved.toml.comparison;
    let comparator = HttpFaceComparator::new(
        &comparison.base_url,
        Duration::from_millis(comparison.timeout_ms),
        Duration::from_millis(comparison.min_interval_ms),
    )
    .context("Failed to create face comparison client")?;
    info!("Face comparison endpoint: {}", comparator.endpoint());

    let event_bus = EventBus::new(256);

    let orchestrator = Arc::new(VerificationOrchestrator::new(
        Arc::new(dataset),
        Arc::new(comparator),
        SessionStore::new(),
        event_bus.clone(),
        VerificationSettings::from(comparison),
        resolved.toml.date_order,
    ));

    let state = AppState::new(Arc::clone(&orchestrator), event_bus);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&resolved.toml.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", resolved.toml.bind_address))?;
    info!("Listening on http://{}", resolved.toml.bind_address);
    info!("Health check: http://{}/health", resolved.toml.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    orchestrator.cancel_active().await;
    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
