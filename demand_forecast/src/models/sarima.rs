//! Seasonal ARIMA models for daily sales
//!
//! The artifact holds the model orders and the log1p-transformed sales
//! history. Parameters are estimated on demand with the two-stage
//! Hannan–Rissanen procedure: a long autoregression supplies innovation
//! estimates, then the ARMA lags are regressed jointly on lagged values and
//! lagged innovations.

use crate::error::{ForecastError, Result};
use crate::forecast::dates_after;
use crate::models::{FittedModel, ForecastModel, RawForecast};
use chrono::NaiveDate;
use sales_math::{least_squares, log1p_all, Differenced, MathError};
use serde::{Deserialize, Serialize};

/// Relative ridge penalty keeping lag regressions well conditioned
const RIDGE: f64 = 1e-8;

/// SARIMA(p,d,q)(P,D,Q,s) model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalArima {
    /// Non-seasonal (p, d, q)
    pub order: (usize, usize, usize),
    /// Seasonal (P, D, Q, s)
    pub seasonal_order: (usize, usize, usize, usize),
    /// Training series on the log1p scale
    pub history: Vec<f64>,
    /// Date of the last observation in `history`
    #[serde(default)]
    pub last_observed: Option<NaiveDate>,
}

/// Fitted SARIMA model
#[derive(Debug, Clone)]
pub struct FittedSeasonalArima {
    name: String,
    intercept: f64,
    ar_lags: Vec<usize>,
    ar_coefficients: Vec<f64>,
    ma_lags: Vec<usize>,
    ma_coefficients: Vec<f64>,
    /// Differencing passes applied to the history
    differenced: Differenced,
    /// Innovation estimates aligned with the differenced series
    residuals: Vec<f64>,
    last_observed: Option<NaiveDate>,
}

impl SeasonalArima {
    /// Create a new model artifact from a log1p-scale history
    pub fn new(
        order: (usize, usize, usize),
        seasonal_order: (usize, usize, usize, usize),
        history: Vec<f64>,
    ) -> Result<Self> {
        let model = Self {
            order,
            seasonal_order,
            history,
            last_observed: None,
        };
        model.validate()?;
        Ok(model)
    }

    /// Create a model artifact from raw sales, applying the log1p transform
    pub fn from_sales(
        order: (usize, usize, usize),
        seasonal_order: (usize, usize, usize, usize),
        sales: &[f64],
    ) -> Result<Self> {
        if sales.iter().any(|s| *s < 0.0) {
            return Err(ForecastError::InvalidParameter(
                "Sales must be non-negative".to_string(),
            ));
        }
        Self::new(order, seasonal_order, log1p_all(sales))
    }

    /// Attach the calendar date of the last observation
    pub fn with_last_observed(mut self, date: NaiveDate) -> Self {
        self.last_observed = Some(date);
        self
    }

    /// Human-readable model description
    pub fn describe(&self) -> String {
        let (p, d, q) = self.order;
        let (sp, sd, sq, s) = self.seasonal_order;
        format!("SARIMA({},{},{})({},{},{},{})", p, d, q, sp, sd, sq, s)
    }

    fn validate(&self) -> Result<()> {
        let (sp, sd, sq, s) = self.seasonal_order;
        if (sp > 0 || sd > 0 || sq > 0) && s < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "Seasonal period must be at least 2 for {}",
                self.describe()
            )));
        }
        if self.history.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Model history is empty".to_string(),
            ));
        }
        if self.history.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(
                "Model history contains non-finite values".to_string(),
            ));
        }

        // Every lag and differencing span has to fit inside the history
        let (p, d, q) = self.order;
        let n = self.history.len();
        let spans = [
            Some(p),
            Some(q),
            sp.checked_mul(s),
            sq.checked_mul(s),
            sd.checked_mul(s).and_then(|span| span.checked_add(d)),
        ];
        if spans.iter().any(|span| span.map_or(true, |span| span >= n)) {
            return Err(ForecastError::InvalidParameter(format!(
                "{} reaches further back than the {} observations of history",
                self.describe(),
                n
            )));
        }
        Ok(())
    }

    fn differencing_lags(&self) -> Vec<usize> {
        let (_, d, _) = self.order;
        let (_, sd, _, s) = self.seasonal_order;
        let mut lags = vec![1; d];
        lags.extend(std::iter::repeat(s).take(sd));
        lags
    }
}

/// Union of non-seasonal lags `1..=order` and seasonal lags `s, 2s, ..`
fn lag_set(order: usize, seasonal_order: usize, period: usize) -> Vec<usize> {
    let mut lags: Vec<usize> = (1..=order)
        .chain((1..=seasonal_order).map(|k| k * period))
        .collect();
    lags.sort_unstable();
    lags.dedup();
    lags
}

/// Residuals of a long autoregression, zero where no fit is available
fn long_ar_residuals(series: &[f64], order: usize) -> Result<Vec<f64>> {
    let n = series.len();
    if n < 2 * order + 2 {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} differenced observations for the innovation pass, got {}",
            2 * order + 2,
            n
        ))
        .into());
    }

    let rows: Vec<Vec<f64>> = (order..n)
        .map(|t| {
            std::iter::once(1.0)
                .chain((1..=order).map(|l| series[t - l]))
                .collect()
        })
        .collect();
    let target = &series[order..];
    let coefficients = least_squares(&rows, target, RIDGE * rows.len() as f64)?;

    let mut residuals = vec![0.0; n];
    for (row, t) in rows.iter().zip(order..n) {
        let fitted: f64 = row.iter().zip(coefficients.iter()).map(|(x, c)| x * c).sum();
        residuals[t] = series[t] - fitted;
    }
    Ok(residuals)
}

impl ForecastModel for SeasonalArima {
    type Fitted = FittedSeasonalArima;

    fn fit(&self) -> Result<FittedSeasonalArima> {
        self.validate()?;

        let (p, _, q) = self.order;
        let (sp, _, sq, s) = self.seasonal_order;

        let differenced = Differenced::new(&self.history, &self.differencing_lags())?;
        let series = differenced.series();
        let n = series.len();

        let ar_lags = lag_set(p, sp, s);
        let ma_lags = lag_set(q, sq, s);
        let max_ar = ar_lags.last().copied().unwrap_or(0);
        let max_ma = ma_lags.last().copied().unwrap_or(0);

        // Stage 1: innovations from a long autoregression
        let (innovations, start) = if ma_lags.is_empty() {
            (vec![0.0; n], max_ar)
        } else {
            let long_order = 2 * max_ar.max(max_ma);
            let residuals = long_ar_residuals(series, long_order)?;
            (residuals, max_ar.max(long_order + max_ma))
        };

        // Stage 2: joint regression on lagged values and lagged innovations
        let width = 1 + ar_lags.len() + ma_lags.len();
        if n <= start + width {
            return Err(MathError::InsufficientData(format!(
                "{} needs more than {} differenced observations, got {}",
                self.describe(),
                start + width,
                n
            ))
            .into());
        }

        let rows: Vec<Vec<f64>> = (start..n)
            .map(|t| {
                std::iter::once(1.0)
                    .chain(ar_lags.iter().map(|&l| series[t - l]))
                    .chain(ma_lags.iter().map(|&l| innovations[t - l]))
                    .collect()
            })
            .collect();
        let coefficients = least_squares(&rows, &series[start..], RIDGE * rows.len() as f64)?;

        let mut residuals = innovations;
        for (row, t) in rows.iter().zip(start..n) {
            let fitted: f64 = row.iter().zip(coefficients.iter()).map(|(x, c)| x * c).sum();
            residuals[t] = series[t] - fitted;
        }

        let intercept = coefficients[0];
        let ar_coefficients = coefficients[1..1 + ar_lags.len()].to_vec();
        let ma_coefficients = coefficients[1 + ar_lags.len()..].to_vec();

        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ForecastError::ForecastFailure(format!(
                "{} produced non-finite coefficients",
                self.describe()
            )));
        }

        Ok(FittedSeasonalArima {
            name: self.describe(),
            intercept,
            ar_lags,
            ar_coefficients,
            ma_lags,
            ma_coefficients,
            differenced,
            residuals,
            last_observed: self.last_observed,
        })
    }

    fn name(&self) -> &str {
        "SARIMA"
    }
}

impl FittedSeasonalArima {
    /// Estimated intercept of the differenced series
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Estimated autoregressive coefficients, paired with their lags
    pub fn ar_terms(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.ar_lags.iter().copied().zip(self.ar_coefficients.iter().copied())
    }

    /// Estimated moving-average coefficients, paired with their lags
    pub fn ma_terms(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.ma_lags.iter().copied().zip(self.ma_coefficients.iter().copied())
    }
}

impl FittedModel for FittedSeasonalArima {
    fn forecast(&self, horizon: usize) -> Result<RawForecast> {
        let mut values = self.differenced.series().to_vec();
        let mut innovations = self.residuals.clone();
        let observed = values.len();

        for _ in 0..horizon {
            let t = values.len();
            let mut next = self.intercept;
            for (lag, coefficient) in self.ar_terms() {
                next += coefficient * values[t - lag];
            }
            for (lag, coefficient) in self.ma_terms() {
                next += coefficient * innovations[t - lag];
            }
            values.push(next);
            // Future innovations have zero expectation
            innovations.push(0.0);
        }

        let forecast = self.differenced.integrate(&values[observed..]);
        if forecast.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ForecastFailure(format!(
                "{} diverged while forecasting {} steps",
                self.name, horizon
            )));
        }

        match self.last_observed {
            Some(last) => Ok(RawForecast::dated(forecast, dates_after(last, horizon)?)),
            None => Ok(RawForecast::undated(forecast)),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    /// Weekly pattern with a gentle trend and a deterministic wobble
    fn weekly_sales(days: usize) -> Vec<f64> {
        let week = [120.0, 95.0, 90.0, 100.0, 130.0, 210.0, 240.0];
        (0..days)
            .map(|t| week[t % 7] * (1.0 + 0.001 * t as f64) + 5.0 * (t as f64 * 0.37).sin())
            .collect()
    }

    #[test]
    fn test_lag_set() {
        assert_eq!(lag_set(2, 2, 7), vec![1, 2, 7, 14]);
        assert_eq!(lag_set(1, 0, 7), vec![1]);
        assert_eq!(lag_set(0, 0, 0), Vec::<usize>::new());
    }

    #[test]
    fn test_invalid_seasonal_period() {
        let result = SeasonalArima::new((1, 0, 0), (1, 1, 0, 1), vec![1.0; 50]);
        assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
    }

    #[rstest]
    #[case((1, 0, 0), (1, 0, 0, usize::MAX))]
    #[case((1, 0, 0), (0, usize::MAX, 0, 7))]
    #[case((0, usize::MAX, 0), (0, 1, 0, 7))]
    #[case((usize::MAX, 0, 0), (0, 0, 0, 0))]
    #[case((1, 1, 1), (1, 1, 1, 50))]
    fn test_lags_must_fit_history(
        #[case] order: (usize, usize, usize),
        #[case] seasonal_order: (usize, usize, usize, usize),
    ) {
        let result = SeasonalArima::new(order, seasonal_order, vec![1.0; 50]);
        assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
    }

    #[test]
    fn test_hostile_artifact_fails_fit_with_typed_error() {
        let history = vec![1.0; 50];
        let json = serde_json::json!({
            "order": [1, 0, 0],
            "seasonal_order": [2, 0, 0, usize::MAX],
            "history": history,
        });
        let model: SeasonalArima = serde_json::from_value(json).unwrap();
        assert!(matches!(model.fit(), Err(ForecastError::InvalidParameter(_))));
    }

    #[test]
    fn test_rejects_negative_sales() {
        assert!(SeasonalArima::from_sales((1, 0, 0), (0, 0, 0, 0), &[1.0, -2.0]).is_err());
    }

    #[test]
    fn test_insufficient_history_fails_fit() {
        let model = SeasonalArima::from_sales((1, 1, 1), (1, 2, 2, 7), &weekly_sales(40)).unwrap();
        assert!(matches!(
            model.fit(),
            Err(ForecastError::Math(MathError::InsufficientData(_)))
        ));
    }

    #[test]
    fn test_ar_recovers_coefficient() {
        // x[t] = 0.6 x[t-1] + e[t], with e[t] from a fixed LCG
        let mut state: u64 = 42;
        let mut noise = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
        };
        let mut series = vec![0.0];
        for t in 1..1000 {
            let previous = series[t - 1];
            series.push(0.6 * previous + noise());
        }
        let model = SeasonalArima::new((1, 0, 0), (0, 0, 0, 0), series).unwrap();
        let fitted = model.fit().unwrap();

        let (lag, coefficient) = fitted.ar_terms().next().unwrap();
        assert_eq!(lag, 1);
        assert!((coefficient - 0.6).abs() < 0.1, "coefficient {}", coefficient);
    }

    #[test]
    fn test_seasonal_forecast_tracks_weekly_pattern() {
        let sales = weekly_sales(364);
        let model = SeasonalArima::from_sales((1, 1, 1), (1, 1, 1, 7), &sales).unwrap();
        let fitted = model.fit().unwrap();
        assert_eq!(fitted.name(), "SARIMA(1,1,1)(1,1,1,7)");

        let forecast = fitted.forecast(14).unwrap();
        assert_eq!(forecast.values.len(), 14);
        assert!(forecast.dates.is_none());

        // Back on the sales scale the weekend peak should stay above midweek
        let sales_forecast: Vec<f64> = forecast.values.iter().map(|v| v.exp_m1()).collect();
        for value in &sales_forecast {
            assert!(*value > 50.0 && *value < 400.0, "value {}", value);
        }
        // Day 364 continues the cycle at index 0; index 6 is the peak day
        assert!(sales_forecast[6] > sales_forecast[2]);
    }

    #[test]
    fn test_forecast_uses_artifact_calendar() {
        let last: NaiveDate = "2016-04-24".parse().unwrap();
        let model = SeasonalArima::from_sales((1, 0, 0), (1, 1, 0, 7), &weekly_sales(120))
            .unwrap()
            .with_last_observed(last);

        let forecast = model.fit().unwrap().forecast(3).unwrap();
        let dates = forecast.dates.unwrap();
        assert_eq!(dates[0], "2016-04-25".parse::<NaiveDate>().unwrap());
        assert_eq!(dates[2], "2016-04-27".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn test_constant_series_forecasts_constant() {
        let model = SeasonalArima::new((1, 1, 0), (0, 0, 0, 0), vec![2.5; 60]).unwrap();
        let forecast = model.fit().unwrap().forecast(5).unwrap();
        for value in forecast.values {
            assert_relative_eq!(value, 2.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_artifact_json_shape() {
        let model = SeasonalArima::new((1, 1, 1), (1, 2, 2, 7), vec![1.0; 20])
            .unwrap()
            .with_last_observed("2016-04-24".parse().unwrap());
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["order"], serde_json::json!([1, 1, 1]));
        assert_eq!(json["seasonal_order"], serde_json::json!([1, 2, 2, 7]));
        assert_eq!(json["last_observed"], "2016-04-24");

        let back: SeasonalArima = serde_json::from_value(json).unwrap();
        assert_eq!(back, model);
    }
}
