//! Telemedicine signaling gateway.
//!
//! Serves the WebSocket signaling channel and the call-control HTTP API
//! over one listener, backed by the in-process presence/session/room
//! state from `telemed-signal-core`.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use telemed_signal_core::{CallSessionManager, InMemoryAppointments, SignalHub};

mod auth;
mod config;
mod http;
mod state;
mod ws;

use config::GatewayConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,signal_gateway=debug")),
        )
        .init();

    let config = GatewayConfig::parse();
    tracing::info!(bind = %config.bind, grace_secs = config.session_grace_secs, "starting signaling gateway");

    // The in-memory directory stands in for the deployment's appointment
    // service; swap in a real AppointmentDirectory to integrate.
    let appointments = Arc::new(InMemoryAppointments::new());
    let sessions = Arc::new(
        CallSessionManager::new(appointments).with_grace_period(config.grace_period()),
    );
    let hub = Arc::new(SignalHub::new());
    let ice = Arc::new(config.ice_config());

    let app = http::router(AppState::new(Some(hub), sessions, ice))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
