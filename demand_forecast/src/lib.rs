//! # Demand Forecast
//!
//! Serves a single pre-trained seasonal sales model and keeps its forecast
//! available without ever computing it on a request path.
//!
//! ## Features
//!
//! - One-time model loading and fitting, shared for the process lifetime
//! - Fit retries with a fixed backoff
//! - Forecasts reported in sales units (`expm1` of the log-scale model output),
//!   dated and summarised at two-decimal precision
//! - A JSON file cache that survives restarts and tolerates corruption
//! - A readiness coordinator publishing `computing` / `ready` / `error` states
//!   to any number of concurrent readers
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use demand_forecast::{FileCache, ForecastEngine, ModelLoader, ReadinessCoordinator};
//! use demand_forecast::models::sarima::SeasonalArima;
//!
//! let loader = ModelLoader::<SeasonalArima>::new("artifacts/model.json");
//! let engine = Arc::new(ForecastEngine::new(loader));
//! let cache = FileCache::new("artifacts/forecast_cache.json");
//!
//! let coordinator = ReadinessCoordinator::start(cache, move || engine.compute_forecast());
//! println!("forecast is {}", coordinator.status());
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod loader;
pub mod models;
pub mod readiness;

// Re-export commonly used types
pub use crate::cache::FileCache;
pub use crate::engine::{ForecastEngine, RetryPolicy, DEFAULT_HORIZON};
pub use crate::error::{ForecastError, Result};
pub use crate::forecast::{ForecastPoint, ForecastResult, ForecastSummary};
pub use crate::loader::{ModelLoader, ModelSource};
pub use crate::models::{FittedModel, ForecastModel, RawForecast};
pub use crate::readiness::{ReadinessCoordinator, ReadinessState, ReadinessStatus};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
