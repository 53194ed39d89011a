//! # Sales Math
//!
//! Numeric building blocks used to fit and report seasonal sales forecasts:
//!
//! - `log1p` / `expm1` variance-stabilising transforms and fixed-precision rounding
//! - Regular and seasonal differencing, and the inverse integration of forecasts
//! - Ridge-regularised least squares for lag regressions

use thiserror::Error;

pub mod differencing;
pub mod regression;
pub mod transform;

/// Errors that can occur in forecasting calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for forecasting math operations
pub type Result<T> = std::result::Result<T, MathError>;

pub use differencing::{difference, Differenced};
pub use regression::{least_squares, solve_linear_system};
pub use transform::{expm1_all, log1p_all, round2, round_to};
