//! # Weathercast
//!
//! Umbrella crate for the weather-driven price forecasting workspace.
//!
//! - [`weather_math`]: rolling windows, degree-days and the drought index
//! - [`price_forecast`]: features, model ensemble, evaluation and forecasts
//!
//! ## Example
//!
//! ```
//! use weathercast_workspace::weather_math::DegreeDayBases;
//!
//! let bases = DegreeDayBases::default();
//! assert_eq!(bases.growing_degree_days(25.0), 15.0);
//! assert_eq!(bases.heating_degree_days(25.0), 0.0);
//! ```

pub use price_forecast;
pub use weather_math;

pub use price_forecast::{CommodityType, ForecastError, ForecastTable, WeatherPriceForecaster};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_members_are_reachable() {
        let forecaster = WeatherPriceForecaster::new(CommodityType::Energy);
        assert_eq!(forecaster.commodity(), CommodityType::Energy);
        assert_eq!(weather_math::DEFAULT_DROUGHT_WINDOW, forecaster.config().drought_window);
    }
}
