//! API route handlers

use crate::app::AppState;
use crate::presentation::{self, render_page};
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use demand_forecast::ReadinessStatus;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub forecast: ReadinessStatus,
}

/// Liveness probe; stays up whatever the forecast state
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive",
        version: env!("CARGO_PKG_VERSION"),
        forecast: state.readiness.status(),
    })
}

pub async fn forecast(State(state): State<AppState>) -> Response {
    presentation::forecast_response(&state.readiness.state())
}

pub async fn forecast_status(State(state): State<AppState>) -> Response {
    let snapshot = state.readiness.state();
    Json(presentation::status_body(&snapshot)).into_response()
}

pub async fn predict_sales(State(state): State<AppState>) -> Response {
    presentation::predict_sales_response(&state.readiness.state())
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&state.pages.index, &state.readiness.state()))
}

pub async fn dashboard(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&state.pages.dashboard, &state.readiness.state()))
}
