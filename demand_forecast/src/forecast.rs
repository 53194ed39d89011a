//! Dated, summarised forecast results

use crate::error::{ForecastError, Result};
use chrono::{Days, NaiveDate};
use sales_math::round2;
use serde::{Deserialize, Serialize};

/// Predicted sales for a single day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Calendar day of the prediction
    pub date: NaiveDate,
    /// Predicted sales in original units, rounded to two decimals
    #[serde(rename = "predicted_sales")]
    pub predicted_value: f64,
}

/// Totals over a forecast, computed from the rounded daily values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    #[serde(rename = "total_predicted_sales")]
    pub total: f64,
    #[serde(rename = "avg_predicted_sales")]
    pub average: f64,
    #[serde(rename = "forecast_days")]
    pub horizon_days: usize,
}

impl ForecastSummary {
    /// Summarise already-rounded daily values.
    pub fn from_values(values: &[f64]) -> Self {
        let total = round2(values.iter().sum());
        let horizon_days = values.len();
        let average = if horizon_days == 0 {
            0.0
        } else {
            round2(total / horizon_days as f64)
        };

        Self {
            total,
            average,
            horizon_days,
        }
    }
}

/// A complete forecast: one point per consecutive day plus its summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    #[serde(rename = "forecast")]
    pub points: Vec<ForecastPoint>,
    pub summary: ForecastSummary,
}

impl ForecastResult {
    /// Build a result from sales-unit values and their dates.
    ///
    /// Values are rounded to two decimals before summarising, so the
    /// reported totals agree with the reported daily values.
    pub fn from_values(dates: &[NaiveDate], values: &[f64]) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::ForecastFailure(format!(
                "Dates length ({}) doesn't match values length ({})",
                dates.len(),
                values.len()
            )));
        }

        let rounded: Vec<f64> = values.iter().map(|v| round2(*v)).collect();
        let points = dates
            .iter()
            .zip(rounded.iter())
            .map(|(date, value)| ForecastPoint {
                date: *date,
                predicted_value: *value,
            })
            .collect();

        Ok(Self {
            points,
            summary: ForecastSummary::from_values(&rounded),
        })
    }

    /// Number of forecast days
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the forecast has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The daily values in date order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.predicted_value).collect()
    }

    /// Check that a deserialized result is a usable forecast.
    ///
    /// Requires a non-empty, gap-free, strictly daily point list whose length
    /// matches the summary's day count.
    pub fn validate(&self) -> Result<()> {
        if self.points.is_empty() {
            return Err(ForecastError::CacheReadInvalid(
                "forecast has no points".to_string(),
            ));
        }

        if self.summary.horizon_days != self.points.len() {
            return Err(ForecastError::CacheReadInvalid(format!(
                "summary reports {} days but {} points are present",
                self.summary.horizon_days,
                self.points.len()
            )));
        }

        for pair in self.points.windows(2) {
            if pair[0].date.checked_add_days(Days::new(1)) != Some(pair[1].date) {
                return Err(ForecastError::CacheReadInvalid(format!(
                    "dates are not consecutive: {} followed by {}",
                    pair[0].date, pair[1].date
                )));
            }
        }

        if self.points.iter().any(|p| !p.predicted_value.is_finite()) {
            return Err(ForecastError::CacheReadInvalid(
                "forecast contains non-finite values".to_string(),
            ));
        }

        Ok(())
    }
}

/// Consecutive calendar days starting the day after `start`.
pub fn dates_after(start: NaiveDate, count: usize) -> Result<Vec<NaiveDate>> {
    (1..=count as u64)
        .map(|offset| {
            start.checked_add_days(Days::new(offset)).ok_or_else(|| {
                ForecastError::ForecastFailure(format!(
                    "date overflow {} days after {}",
                    offset, start
                ))
            })
        })
        .collect()
}
