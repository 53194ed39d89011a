//! # Forecast Server
//!
//! REST API and dashboard for the sales demand forecast.
//!
//! - `GET /api/v1/forecast`: the forecast once ready (`202` while computing, `503` on failure)
//! - `GET /api/v1/forecast/status`: `ready` / `computing` / `error`
//! - `GET /api/v1/predict_sales`: the forecast wrapped in the legacy response envelope
//! - `GET /dashboard`: dashboard page with the forecast embedded when available
//! - `GET /health`: liveness
//!
//! Handlers only read the [`ReadinessCoordinator`](demand_forecast::ReadinessCoordinator);
//! the forecast itself is computed once, in the background, at startup.

pub mod app;
pub mod config;
pub mod presentation;
pub mod routes;

pub use crate::app::{build_router, startup, AppState, Pages};
pub use crate::config::ServerConfig;
