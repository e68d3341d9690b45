//! Lag, rolling and calendar features

use crate::data::Frame;
use crate::error::Result;
use crate::weather::CommodityType;
use chrono::Datelike;
use log::debug;
use std::f64::consts::PI;
use weather_math::{lag, rolling_mean, rolling_std};

/// Lags, in days, added for every primary attribute and the target
pub const LAGS: [usize; 2] = [1, 7];
/// Trailing mean windows, in days
pub const ROLLING_WINDOWS: [usize; 2] = [7, 30];
/// Window of the target's rolling volatility
pub const VOLATILITY_WINDOW: usize = 30;

/// Names of the calendar columns, in the order they are added
pub const CALENDAR_COLUMNS: [&str; 7] = [
    "month",
    "day_of_year",
    "year",
    "month_sin",
    "month_cos",
    "day_of_year_sin",
    "day_of_year_cos",
];

/// Derives model features from a daily weather/price frame
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    commodity: CommodityType,
}

impl FeatureBuilder {
    pub fn new(commodity: CommodityType) -> Self {
        Self { commodity }
    }

    pub fn commodity(&self) -> CommodityType {
        self.commodity
    }

    /// Return a copy of `frame` with lag, rolling and calendar columns added.
    ///
    /// Rows are expected in date order and one day apart. Rows without
    /// enough history hold `None` in the affected columns.
    ///
    /// Weather windows end on the current day. Target windows end on the
    /// previous day: the target is lagged by one before rolling, so
    /// `commodity_price_rolling_mean_7` on day `t` averages days `t-7..=t-1`
    /// rather than the usual trailing `t-6..=t`. This keeps a row's own
    /// price out of its features, and it is why training rows start on
    /// day 30 instead of day 29.
    pub fn build(&self, frame: &Frame, target: Option<&str>) -> Result<Frame> {
        let mut features = frame.clone();

        for attribute in self.commodity.primary_attributes() {
            let name = attribute.column_name();
            let values = frame.require_column(name)?;

            for periods in LAGS {
                features.insert_column(&format!("{}_lag_{}", name, periods), lag(&values, periods))?;
            }
            for window in ROLLING_WINDOWS {
                features.insert_column(
                    &format!("{}_rolling_mean_{}", name, window),
                    rolling_mean(&values, window)?,
                )?;
            }
        }

        if let Some(target) = target {
            let values = frame.require_column(target)?;
            let previous = lag(&values, 1);

            for periods in LAGS {
                features.insert_column(&format!("{}_lag_{}", target, periods), lag(&values, periods))?;
            }
            for window in ROLLING_WINDOWS {
                features.insert_column(
                    &format!("{}_rolling_mean_{}", target, window),
                    rolling_mean(&previous, window)?,
                )?;
            }
            features.insert_column(
                &format!("{}_rolling_std_{}", target, VOLATILITY_WINDOW),
                rolling_std(&previous, VOLATILITY_WINDOW)?,
            )?;
        }

        self.add_calendar(&mut features)?;

        debug!(
            "Built {} feature columns over {} rows",
            features.width(),
            features.len()
        );
        Ok(features)
    }

    /// Features for training: complete rows only
    pub fn build_training(&self, frame: &Frame, target: &str) -> Result<Frame> {
        self.build(frame, Some(target))?.drop_incomplete_rows()
    }

    fn add_calendar(&self, features: &mut Frame) -> Result<()> {
        let dates = features.dates();
        let month: Vec<f64> = dates.iter().map(|d| d.month() as f64).collect();
        let day_of_year: Vec<f64> = dates.iter().map(|d| d.ordinal() as f64).collect();
        let year: Vec<f64> = dates.iter().map(|d| d.year() as f64).collect();

        let cyclic = |values: &[f64], period: f64, f: fn(f64) -> f64| -> Vec<f64> {
            values.iter().map(|&v| f(2.0 * PI * v / period)).collect()
        };
        let month_sin = cyclic(&month, 12.0, f64::sin);
        let month_cos = cyclic(&month, 12.0, f64::cos);
        let day_of_year_sin = cyclic(&day_of_year, 365.25, f64::sin);
        let day_of_year_cos = cyclic(&day_of_year, 365.25, f64::cos);

        let columns = [
            month,
            day_of_year,
            year,
            month_sin,
            month_cos,
            day_of_year_sin,
            day_of_year_cos,
        ];
        for (name, values) in CALENDAR_COLUMNS.iter().zip(columns) {
            features.insert_values(name, values)?;
        }
        Ok(())
    }
}

/// Every column of `features` except the target, in frame order
pub fn feature_columns(features: &Frame, target: &str) -> Vec<String> {
    features
        .column_names()
        .into_iter()
        .filter(|name| *name != target)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::SyntheticWeatherGenerator;
    use chrono::NaiveDate;

    fn sample(commodity: CommodityType, days: usize) -> Frame {
        SyntheticWeatherGenerator::new(commodity)
            .generate(days, NaiveDate::from_ymd_opt(2021, 3, 1).unwrap())
            .unwrap()
    }

    #[test]
    fn test_input_is_not_mutated() {
        let frame = sample(CommodityType::Agricultural, 50);
        let before = frame.clone();
        let _ = FeatureBuilder::new(CommodityType::Agricultural)
            .build(&frame, Some("commodity_price"))
            .unwrap();
        assert_eq!(frame, before);
    }

    #[test]
    fn test_target_windows_exclude_current_day() {
        let frame = sample(CommodityType::Energy, 40);
        let features = FeatureBuilder::new(CommodityType::Energy)
            .build(&frame, Some("commodity_price"))
            .unwrap();

        let price = frame.column_values("commodity_price").unwrap();
        let mean_7 = features.column("commodity_price_rolling_mean_7").unwrap();

        // day 7 sees days 0..=6
        assert!(mean_7[6].is_none());
        let expected: f64 = price[0..7].iter().sum::<f64>() / 7.0;
        assert!((mean_7[7].unwrap() - expected).abs() < 1e-9);

        let std_30 = features.column("commodity_price_rolling_std_30").unwrap();
        assert!(std_30[29].is_none());
        assert!(std_30[30].is_some());
    }

    #[test]
    fn test_energy_uses_its_own_attributes() {
        let frame = sample(CommodityType::Energy, 40);
        let features = FeatureBuilder::new(CommodityType::Energy).build(&frame, None).unwrap();

        assert!(features.has_column("heating_degree_days_rolling_mean_30"));
        assert!(features.has_column("wind_speed_lag_7"));
        assert!(!features.has_column("drought_index_lag_1"));
        assert!(!features.has_column("commodity_price_lag_1"));
    }

    #[test]
    fn test_training_rows_are_complete() {
        let frame = sample(CommodityType::Agricultural, 80);
        let training = FeatureBuilder::new(CommodityType::Agricultural)
            .build_training(&frame, "commodity_price")
            .unwrap();

        // the previous-day 30-day target window first fills on day 30
        assert_eq!(training.len(), 80 - 30);
        assert_eq!(training.dates()[0], frame.dates()[30]);
    }

    #[test]
    fn test_calendar_encoding() {
        let frame = sample(CommodityType::Agricultural, 1);
        let features = FeatureBuilder::new(CommodityType::Agricultural).build(&frame, None).unwrap();

        assert_eq!(features.column("month").unwrap()[0], Some(3.0));
        assert_eq!(features.column("year").unwrap()[0], Some(2021.0));
        let sin = features.column("month_sin").unwrap()[0].unwrap();
        assert!((sin - (2.0 * PI * 3.0 / 12.0).sin()).abs() < 1e-12);
    }
}
