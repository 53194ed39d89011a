//! Error types for the demand_forecast crate

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the forecasting subsystem, one variant per failure kind
#[derive(Debug, Clone, Error)]
pub enum ForecastError {
    /// The model artifact file does not exist
    #[error("Model artifact not found at {}", .0.display())]
    ArtifactMissing(PathBuf),

    /// The model artifact exists but could not be read or deserialized
    #[error("Model artifact at {} is corrupt: {reason}", .path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    /// The forecast cache file holds data that is not a usable forecast
    #[error("Invalid forecast cache: {0}")]
    CacheReadInvalid(String),

    /// The forecast cache file could not be written
    #[error("Failed to write forecast cache: {0}")]
    CacheWrite(String),

    /// Every fit attempt failed; carries the last failure
    #[error("Model fit failed after {attempts} attempt(s): {message}")]
    FitFailure { attempts: u32, message: String },

    /// The fitted model could not produce a usable forecast
    #[error("Forecasting error: {0}")]
    ForecastFailure(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from numeric routines
    #[error("Math error: {0}")]
    Math(#[from] sales_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
