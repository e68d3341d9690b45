//! Error types for the price_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;
use weather_math::MathError;

/// Custom error types for the price_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to parameter or input validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A single model failed to train or predict
    #[error("Model error: {0}")]
    ModelError(String),

    /// Too few usable rows for the requested operation
    #[error("Insufficient data: need at least {needed} rows, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// The forecaster was used before `fit`
    #[error("Not fitted: {0}")]
    NotFitted(String),

    /// Every model in the ensemble failed to produce a prediction
    #[error("No model available to produce a prediction")]
    NoModelAvailable,

    /// Error from rolling-window or weather indicator calculations
    #[error("Math error: {0}")]
    MathError(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<smartcore::error::Failed> for ForecastError {
    fn from(err: smartcore::error::Failed) -> Self {
        ForecastError::ModelError(err.to_string())
    }
}
