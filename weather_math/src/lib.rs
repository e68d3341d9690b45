//! # Weather Math
//!
//! Numeric building blocks for weather-driven price models.
//! This crate provides rolling-window statistics over daily series and
//! the derived weather indicators (degree-days, frost, drought) that the
//! feature pipeline is built from.

use thiserror::Error;

pub mod degree_days;
pub mod drought;
pub mod rolling;

pub use degree_days::DegreeDayBases;
pub use drought::{drought_index, DEFAULT_DROUGHT_WINDOW};
pub use rolling::{expanding_mean, lag, rolling_mean, rolling_std, RollingWindow};

/// Errors that can occur in weather and rolling-window calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for weather math operations
pub type Result<T> = std::result::Result<T, MathError>;
