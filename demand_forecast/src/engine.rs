//! Forecast engine: one-time fitting with retries, then dated, summarised forecasts

use crate::error::{ForecastError, Result};
use crate::forecast::{dates_after, ForecastResult};
use crate::loader::ModelSource;
use crate::models::{FittedModel, ForecastModel, RawForecast};
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use sales_math::expm1_all;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Number of daily steps forecast by default
pub const DEFAULT_HORIZON: usize = 30;

type Fitted<S> = <<S as ModelSource>::Model as ForecastModel>::Fitted;

/// Bounded retry with a fixed pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create a retry policy; `max_attempts` counts the first attempt and
    /// must be at least 1
    pub fn new(max_attempts: u32, backoff: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(ForecastError::InvalidParameter(
                "At least one fit attempt is required".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            backoff,
        })
    }

    /// Total number of attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between consecutive attempts
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Run `op` until it succeeds or the attempts are exhausted.
    ///
    /// `op` receives the 1-based attempt number. Exhaustion yields
    /// `FitFailure` carrying the last error.
    pub fn run<T, F>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let max_attempts = self.max_attempts;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Model fit attempt failed");
                    last_error = Some(e);
                    if attempt < max_attempts && !self.backoff.is_zero() {
                        thread::sleep(self.backoff);
                    }
                }
            }
        }

        Err(ForecastError::FitFailure {
            attempts: max_attempts,
            message: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

/// Produces forecasts from a model that is fitted at most once
#[derive(Debug)]
pub struct ForecastEngine<S: ModelSource> {
    source: S,
    fitted: Mutex<Option<Arc<Fitted<S>>>>,
    retry: RetryPolicy,
    horizon: usize,
}

impl<S: ModelSource> ForecastEngine<S> {
    /// Create an engine with the default horizon and retry policy
    pub fn new(source: S) -> Self {
        Self {
            source,
            fitted: Mutex::new(None),
            retry: RetryPolicy::default(),
            horizon: DEFAULT_HORIZON,
        }
    }

    /// Set the fit retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the number of days to forecast
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Whether a fitted model is cached
    pub fn is_fitted(&self) -> bool {
        self.fitted.lock().is_some()
    }

    /// Get the fitted model, fitting it on first use.
    ///
    /// The lock is held for the whole fit so concurrent callers wait for
    /// the same result instead of fitting again. Failed fits are not cached.
    pub fn fitted_model(&self) -> Result<Arc<Fitted<S>>> {
        let mut fitted = self.fitted.lock();
        if let Some(model) = fitted.as_ref() {
            return Ok(Arc::clone(model));
        }

        let model = self.source.load()?;
        info!(model = model.name(), "Fitting model");
        let started = Instant::now();

        let result = self.retry.run(|attempt| {
            debug!(attempt, "Starting model fit");
            model.fit()
        })?;
        let result = Arc::new(result);

        info!(
            model = result.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model fitted"
        );
        *fitted = Some(Arc::clone(&result));
        Ok(result)
    }

    /// Compute the forecast, dating undated output from today (UTC)
    pub fn compute_forecast(&self) -> Result<ForecastResult> {
        self.compute_forecast_from(Utc::now().date_naive())
    }

    /// Compute the forecast, dating undated output from the day after `today`
    pub fn compute_forecast_from(&self, today: NaiveDate) -> Result<ForecastResult> {
        let fitted = self.fitted_model()?;
        let raw = fitted.forecast(self.horizon).map_err(|e| match e {
            ForecastError::ForecastFailure(_) => e,
            other => ForecastError::ForecastFailure(other.to_string()),
        })?;

        let result = to_forecast_result(raw, today)?;
        info!(
            days = result.summary.horizon_days,
            total = result.summary.total,
            "Next sales predicted successfully"
        );
        Ok(result)
    }
}

/// Convert log-scale model output into a dated forecast in sales units.
///
/// Values go through `expm1` (negative results clamp to zero), take the
/// forecast's own dates when it has them, and are rounded to two decimals
/// before the summary is computed.
pub fn to_forecast_result(raw: RawForecast, today: NaiveDate) -> Result<ForecastResult> {
    if raw.values.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::ForecastFailure(
            "Model produced non-finite forecast values".to_string(),
        ));
    }

    let sales: Vec<f64> = expm1_all(&raw.values)
        .into_iter()
        .map(|v| v.max(0.0))
        .collect();

    let dates = match raw.dates {
        Some(dates) if dates.len() == sales.len() => dates,
        Some(dates) => {
            return Err(ForecastError::ForecastFailure(format!(
                "Forecast has {} values but {} dates",
                sales.len(),
                dates.len()
            )))
        }
        None => dates_after(today, sales.len())?,
    };

    ForecastResult::from_values(&dates, &sales)
}
