// =============================================================================
// QuotePulse Market Collector - Main Entry Point
// =============================================================================
//
// Periodically fetches price/volume readings for a fixed set of symbols,
// keeps a bounded rolling history per symbol in memory, forwards batches to
// the prediction service once enough history exists, and serves the cached
// history over a small REST API.
// =============================================================================

mod api;
mod app_state;
mod collector;
mod market_data;
mod predictor;
mod runtime_config;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::{QuoteSource, YahooQuoteClient};
use crate::predictor::{Forwarder, PredictionClient};
use crate::runtime_config::RuntimeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("QuotePulse market collector starting up");

    let mut config = RuntimeConfig::load("quotepulse.json").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Environment overrides for deployment settings.
    if let Ok(syms) = std::env::var("QUOTEPULSE_SYMBOLS") {
        config.symbols = syms
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(port) = std::env::var("PORT") {
        config.listen_port = port.parse().context("PORT is not a valid port number")?;
    }
    if let Ok(host) = std::env::var("ML_SERVICE_HOST") {
        config.predictor_host = host;
    }
    if let Ok(port) = std::env::var("ML_PORT") {
        config.predictor_port = port.parse().context("ML_PORT is not a valid port number")?;
    }

    info!(symbols = ?config.symbols, "Configured symbols");
    info!(
        predictor = %format!("http://{}:{}", config.predictor_host, config.predictor_port),
        interval_secs = config.fetch_interval_secs,
        "Forwarding batches once history reaches {} readings",
        config.forward_threshold
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config.clone()));

    // ── 3. External collaborators ────────────────────────────────────────
    let source: Arc<dyn QuoteSource> = Arc::new(YahooQuoteClient::new());
    let forwarder: Arc<dyn Forwarder> = Arc::new(PredictionClient::new(
        &config.predictor_host,
        config.predictor_port,
    ));

    // ── 4. Spawn collection tasks ────────────────────────────────────────
    collector::spawn_collectors(&state, source, forwarder);
    info!(count = state.config.symbols.len(), "Collection tasks launched");

    // ── 5. Start the API server ──────────────────────────────────────────
    // Binding is the only process-fatal failure; everything after this point
    // recovers locally.
    let bind_addr = format!("0.0.0.0:{}", config.listen_port);
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Shutdown ──────────────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping");

    Ok(())
}
