//! # Price Forecast
//!
//! Weather-driven commodity price forecasting with a weighted ensemble of
//! independently trained regressors.
//!
//! ## Features
//!
//! - Daily weather/price tables (`Frame`) with CSV and polars interchange
//! - Lag, rolling and calendar features per commodity type
//! - Random forest, gradient boosting, linear, ridge, ARIMA and an optional
//!   echo state network sequence model (`sequence` cargo feature)
//! - Blend weights from forward-chaining cross-validated R2
//! - Held-out evaluation and multi-day forecasts over future weather
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use price_forecast::{CommodityType, WeatherPriceForecaster};
//!
//! let mut forecaster = WeatherPriceForecaster::new(CommodityType::Agricultural);
//! let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
//! let history = forecaster.generate_synthetic_data(1000, start)?;
//!
//! forecaster.fit(&history, "commodity_price", 0.2)?;
//! println!("{}", forecaster.evaluate()?);
//!
//! let forecast = forecaster.forecast(&history, 30)?;
//! assert_eq!(forecast.len(), 30);
//! # Ok::<(), price_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod metrics;
pub mod models;
pub mod scaling;
pub mod utils;
pub mod weather;

// Re-export commonly used types
pub use crate::config::{Capabilities, EnsembleConfig};
pub use crate::data::{DataLoader, Frame, DEFAULT_TARGET_COLUMN};
pub use crate::ensemble::{EnsembleWeights, FittedEnsemble};
pub use crate::error::{ForecastError, Result};
pub use crate::features::FeatureBuilder;
pub use crate::forecaster::{ForecastRow, ForecastTable, WeatherPriceForecaster};
pub use crate::metrics::EvaluationMetrics;
pub use crate::models::ModelKind;
pub use crate::weather::{CommodityType, FutureWeather, SyntheticWeatherGenerator, WeatherAttribute};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
