//! Forecasting models served by the engine

use crate::error::Result;
use chrono::NaiveDate;
use std::fmt::Debug;

/// Model output before transforms, dating and rounding
#[derive(Debug, Clone, PartialEq)]
pub struct RawForecast {
    /// Forecasted values on the model's (log1p) scale
    pub values: Vec<f64>,
    /// Dates of the forecasted values, when the model knows its own calendar
    pub dates: Option<Vec<NaiveDate>>,
}

impl RawForecast {
    /// Forecast values without a date index
    pub fn undated(values: Vec<f64>) -> Self {
        Self {
            values,
            dates: None,
        }
    }

    /// Forecast values with their dates
    pub fn dated(values: Vec<f64>, dates: Vec<NaiveDate>) -> Self {
        Self {
            values,
            dates: Some(dates),
        }
    }
}

/// Fitted model, ready to forecast
pub trait FittedModel: Debug + Send + Sync {
    /// Generate forecast for future periods
    fn forecast(&self, horizon: usize) -> Result<RawForecast>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Model artifact that must be fitted before it can forecast
pub trait ForecastModel: Debug + Send + Sync {
    /// The type of fitted model produced
    type Fitted: FittedModel;

    /// Estimate the model parameters from the artifact's history
    fn fit(&self) -> Result<Self::Fitted>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod sarima;
