//! Application state, router and startup wiring

use crate::config::ServerConfig;
use crate::routes;
use axum::routing::get;
use axum::Router;
use demand_forecast::models::sarima::SeasonalArima;
use demand_forecast::{FileCache, ForecastEngine, ModelLoader, ReadinessCoordinator, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const DASHBOARD_TEMPLATE: &str = include_str!("../templates/dashboard.html");

/// Page templates, loaded once at startup
#[derive(Debug, Clone)]
pub struct Pages {
    pub index: String,
    pub dashboard: String,
}

impl Pages {
    /// Templates compiled into the binary
    pub fn embedded() -> Self {
        Self {
            index: INDEX_TEMPLATE.to_string(),
            dashboard: DASHBOARD_TEMPLATE.to_string(),
        }
    }

    /// Templates from `dir` where present, embedded ones otherwise
    pub fn load(dir: &Path) -> Self {
        Self {
            index: read_template(&dir.join("index.html"), INDEX_TEMPLATE),
            dashboard: read_template(&dir.join("dashboard.html"), DASHBOARD_TEMPLATE),
        }
    }
}

fn read_template(path: &Path, fallback: &str) -> String {
    match fs::read_to_string(path) {
        Ok(template) => {
            info!(path = %path.display(), "Using page template override");
            template
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => fallback.to_string(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable page template; using built-in page");
            fallback.to_string()
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub readiness: Arc<ReadinessCoordinator>,
    pub pages: Arc<Pages>,
}

impl AppState {
    pub fn new(readiness: Arc<ReadinessCoordinator>, pages: Pages) -> Self {
        Self {
            readiness,
            pages: Arc::new(pages),
        }
    }
}

/// Build the router; `static_dir` is served under `/static` when given
pub fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/forecast", get(routes::forecast))
        .route("/forecast/status", get(routes::forecast_status))
        .route("/predict_sales", get(routes::predict_sales));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/", get(routes::index))
        .route("/dashboard", get(routes::dashboard))
        .route("/dashboard.html", get(routes::dashboard))
        .route("/health", get(routes::health))
        .nest("/api/v1", api);

    if let Some(dir) = static_dir {
        router = router.nest_service("/static", ServeDir::new(dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Wire loader, engine, cache and coordinator, and build the router.
///
/// Returns as soon as the coordinator has checked the file cache; a missing
/// forecast is computed in the background.
pub fn startup(config: &ServerConfig) -> Result<(Router, Arc<ReadinessCoordinator>)> {
    let loader = ModelLoader::<SeasonalArima>::new(&config.model_path);
    let engine = ForecastEngine::new(loader)
        .with_horizon(config.horizon)
        .with_retry_policy(config.retry_policy()?);
    let cache = FileCache::new(&config.cache_path);

    info!(
        model = %config.model_path.display(),
        cache = %config.cache_path.display(),
        horizon = config.horizon,
        "Starting forecast service"
    );
    let readiness = ReadinessCoordinator::start(cache, move || engine.compute_forecast());

    let static_dir = config.static_dir();
    let static_dir = if static_dir.is_dir() {
        Some(static_dir)
    } else {
        warn!(path = %static_dir.display(), "Static directory not found; /static disabled");
        None
    };

    let state = AppState::new(Arc::clone(&readiness), Pages::load(&config.frontend_dir));
    Ok((build_router(state, static_dir), readiness))
}
