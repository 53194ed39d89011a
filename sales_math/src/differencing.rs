//! Differencing for integrated (ARIMA-style) models
//!
//! A series is made stationary by repeatedly subtracting lagged values
//! (lag 1 for regular differencing, lag `s` for seasonal differencing).
//! Forecasts produced on the differenced scale are integrated back using the
//! tail of every intermediate level.

use crate::{MathError, Result};

/// Difference a series once at the given lag: `y[t] = x[t] - x[t - lag]`.
pub fn difference(series: &[f64], lag: usize) -> Result<Vec<f64>> {
    if lag == 0 {
        return Err(MathError::InvalidInput(
            "Differencing lag must be at least 1".to_string(),
        ));
    }
    if series.len() <= lag {
        return Err(MathError::InsufficientData(format!(
            "Need more than {} observations to difference at lag {}, got {}",
            lag,
            lag,
            series.len()
        )));
    }

    Ok((lag..series.len())
        .map(|i| series[i] - series[i - lag])
        .collect())
}

/// A series after a sequence of differencing passes, keeping every
/// intermediate level so forecasts can be integrated back.
#[derive(Debug, Clone)]
pub struct Differenced {
    /// `levels[0]` is the original series, `levels[i + 1]` is `levels[i]`
    /// differenced at `lags[i]`
    levels: Vec<Vec<f64>>,
    lags: Vec<usize>,
}

impl Differenced {
    /// Apply the differencing passes in order.
    pub fn new(series: &[f64], lags: &[usize]) -> Result<Self> {
        let mut levels = Vec::with_capacity(lags.len() + 1);
        levels.push(series.to_vec());

        for &lag in lags {
            let next = difference(&levels[levels.len() - 1], lag)?;
            levels.push(next);
        }

        Ok(Self {
            levels,
            lags: lags.to_vec(),
        })
    }

    /// The fully differenced series
    pub fn series(&self) -> &[f64] {
        &self.levels[self.levels.len() - 1]
    }

    /// The lags applied, in order
    pub fn lags(&self) -> &[usize] {
        &self.lags
    }

    /// Undo the differencing for values that continue the differenced series.
    pub fn integrate(&self, forecast: &[f64]) -> Vec<f64> {
        let mut current = forecast.to_vec();

        // Walk back from the last pass to the first
        for (level, &lag) in self
            .levels
            .iter()
            .rev()
            .skip(1)
            .zip(self.lags.iter().rev())
        {
            let mut extended: Vec<f64> = level[level.len() - lag..].to_vec();
            let mut restored = Vec::with_capacity(current.len());

            for &delta in &current {
                let value = delta + extended[extended.len() - lag];
                extended.push(value);
                restored.push(value);
            }

            current = restored;
        }

        current
    }
}
