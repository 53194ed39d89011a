//! # forecast_server
//!
//! Serves the sales demand forecast API and dashboard.

use anyhow::Context;
use clap::Parser;
use demand_forecast::ReadinessState;
use forecast_server::{startup, ServerConfig};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "forecast_server=info,demand_forecast=info,tower_http=info".into()
            }),
        )
        .init();

    let config = ServerConfig::parse();
    let addr = config
        .socket_addr()
        .with_context(|| format!("Invalid HOST:PORT configuration {}:{}", config.host, config.port))?;

    let (app, readiness) = startup(&config).context("Invalid forecast configuration")?;

    tokio::spawn(async move {
        match &*readiness.settled().await {
            ReadinessState::Ready(result) => info!(
                days = result.summary.horizon_days,
                total = result.summary.total,
                "Forecast available"
            ),
            ReadinessState::Error(message) => {
                error!(error = %message, "Forecast unavailable; serving error status")
            }
            ReadinessState::Computing => {}
        }
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("forecast_server v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
