//! The public forecaster: fit, predict, evaluate and forecast

use crate::config::{Capabilities, EnsembleConfig};
use crate::data::Frame;
use crate::ensemble::{self, EnsembleWeights, FittedEnsemble};
use crate::error::{ForecastError, Result};
use crate::features::{feature_columns, FeatureBuilder};
use crate::metrics::{evaluate_predictions, EvaluationMetrics};
use crate::models::ModelKind;
use crate::utils::{future_dates, split_frame};
use crate::weather::{
    with_derived_weather, ClimatologyWeather, CommodityType, FutureWeather,
    SyntheticWeatherGenerator, WeatherAttribute,
};
use chrono::NaiveDate;
use log::{debug, info};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Column holding forecast prices in [`ForecastTable::to_frame`]
pub const PREDICTED_PRICE_COLUMN: &str = "predicted_price";

/// One forecast day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub predicted_price: f64,
}

/// Forecast prices in date order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    rows: Vec<ForecastRow>,
}

impl ForecastTable {
    pub fn new(dates: &[NaiveDate], prices: &[f64]) -> Result<Self> {
        if dates.len() != prices.len() {
            return Err(ForecastError::DataError(format!(
                "{} forecast dates but {} prices",
                dates.len(),
                prices.len()
            )));
        }
        Ok(Self {
            rows: dates
                .iter()
                .zip(prices)
                .map(|(&date, &predicted_price)| ForecastRow {
                    date,
                    predicted_price,
                })
                .collect(),
        })
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.predicted_price).collect()
    }

    pub fn to_frame(&self) -> Result<Frame> {
        Frame::new(self.dates()).with_column(
            PREDICTED_PRICE_COLUMN,
            self.rows.iter().map(|r| Some(r.predicted_price)).collect(),
        )
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        Ok(self.to_frame()?.to_dataframe())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.rows)?)
    }
}

/// Weather-driven ensemble price forecaster for one commodity
#[derive(Debug, Clone)]
pub struct WeatherPriceForecaster {
    config: EnsembleConfig,
    capabilities: Capabilities,
    builder: FeatureBuilder,
    fitted: Option<Arc<FittedEnsemble>>,
}

impl WeatherPriceForecaster {
    /// Forecaster with the default configuration for `commodity`
    pub fn new(commodity: CommodityType) -> Self {
        Self::from_valid_config(EnsembleConfig::new(commodity))
    }

    /// Forecaster with a custom configuration
    pub fn with_config(config: EnsembleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: EnsembleConfig) -> Self {
        let capabilities = Capabilities::detect();
        info!(
            "Creating {} forecaster (sequence model available: {})",
            config.commodity, capabilities.sequence_model
        );
        Self {
            builder: FeatureBuilder::new(config.commodity),
            config,
            capabilities,
            fitted: None,
        }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn commodity(&self) -> CommodityType {
        self.config.commodity
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Synthetic weather and price history (seed 42)
    pub fn generate_synthetic_data(&self, n_samples: usize, start_date: NaiveDate) -> Result<Frame> {
        SyntheticWeatherGenerator::new(self.config.commodity)
            .with_bases(self.config.degree_days)
            .with_drought_window(self.config.drought_window)
            .with_target_column(&self.config.target_column)
            .generate(n_samples, start_date)
    }

    /// Build features, split chronologically and train the ensemble.
    ///
    /// The last `test_size` fraction of complete feature rows is held out
    /// for [`evaluate`](Self::evaluate). The ARIMA model is fitted on the
    /// whole price column of `table`.
    pub fn fit(&mut self, table: &Frame, target_column: &str, test_size: f64) -> Result<()> {
        if !(0.0..1.0).contains(&test_size) {
            return Err(ForecastError::ValidationError(format!(
                "Test size must be in [0, 1), got {}",
                test_size
            )));
        }

        let table = table.sort_by_date()?;
        let features = self.builder.build_training(&table, target_column)?;
        if features.len() < 2 {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: features.len(),
            });
        }

        let (train, test) = split_frame(&features, test_size);
        info!(
            "Fitting on {} rows, holding out {} ({} feature rows from {} input rows)",
            train.len(),
            test.len(),
            features.len(),
            table.len()
        );

        let prices: Vec<f64> = table
            .require_column(target_column)?
            .into_iter()
            .flatten()
            .collect();

        let mut config = self.config.clone();
        config.target_column = target_column.to_string();

        let ensemble = FittedEnsemble::fit(
            &config,
            self.capabilities,
            feature_columns(&features, target_column),
            train,
            test,
            &prices,
        )?;

        self.config = config;
        self.fitted = Some(Arc::new(ensemble));
        Ok(())
    }

    /// The current fit, shared
    pub fn fitted(&self) -> Option<Arc<FittedEnsemble>> {
        self.fitted.clone()
    }

    fn require_fitted(&self, operation: &str) -> Result<&FittedEnsemble> {
        self.fitted
            .as_deref()
            .ok_or_else(|| ForecastError::NotFitted(format!("call fit before {}", operation)))
    }

    pub fn weights(&self) -> Option<&EnsembleWeights> {
        self.fitted.as_deref().map(FittedEnsemble::weights)
    }

    pub fn cv_scores(&self) -> Option<&BTreeMap<ModelKind, f64>> {
        self.fitted.as_deref().map(FittedEnsemble::cv_scores)
    }

    /// Blended prediction for each row of a feature frame
    pub fn predict(&self, features: &Frame) -> Result<Vec<f64>> {
        let ensemble = self.require_fitted("predict")?;
        ensemble::predict(ensemble, features)
    }

    /// Accuracy of the ensemble on the held-out split
    pub fn evaluate(&self) -> Result<EvaluationMetrics> {
        let ensemble = self.require_fitted("evaluate")?;
        let test = ensemble.test_split();
        if test.is_empty() {
            return Err(ForecastError::ValidationError(
                "No held-out rows to evaluate; fit with a positive test size".to_string(),
            ));
        }

        let predicted = ensemble::predict(ensemble, test)?;
        let actual = test.column_values(ensemble.target_column())?;
        let metrics = evaluate_predictions(&actual, &predicted)?;
        info!(
            "Held-out MAE {:.4}, RMSE {:.4}, R2 {:.4}",
            metrics.mae, metrics.rmse, metrics.r2
        );
        Ok(metrics)
    }

    /// Forecast `horizon` days past the end of `history` with climatological weather
    pub fn forecast(&self, history: &Frame, horizon: usize) -> Result<ForecastTable> {
        let weather = ClimatologyWeather::new(self.config.weather_seed);
        self.forecast_with_weather(history, horizon, &weather)
    }

    /// Forecast `horizon` days past the end of `history` with weather from `source`.
    ///
    /// Derived weather for the future days is computed from the history plus
    /// the future raw weather, so the drought index sees past precipitation.
    /// Future rows carry the last known price as a placeholder target so
    /// lag and rolling features can be formed; remaining gaps are
    /// forward-filled, then zero-filled.
    pub fn forecast_with_weather(
        &self,
        history: &Frame,
        horizon: usize,
        source: &dyn FutureWeather,
    ) -> Result<ForecastTable> {
        let ensemble = self.require_fitted("forecast")?;
        if horizon == 0 {
            return Ok(ForecastTable::default());
        }

        let target = ensemble.target_column();
        let history = history.sort_by_date()?;
        let last_date = history
            .last_date()
            .ok_or_else(|| ForecastError::DataError("History is empty".to_string()))?;
        let last_price = history.last_value(target).ok_or_else(|| {
            ForecastError::DataError(format!("History has no value in '{}'", target))
        })?;

        let dates = future_dates(last_date, horizon);
        let future = source.weather_for(&dates, &history)?;
        if future.dates() != dates.as_slice() {
            return Err(ForecastError::DataError(format!(
                "Future weather covers {} rows, expected {} days after {}",
                future.len(),
                horizon,
                last_date
            )));
        }

        let mut extended = history.concat(&future)?;
        self.fill_derived_weather(&mut extended)?;

        let placeholder = history.len()..extended.len();
        let mut prices = extended.require_column(target)?;
        for price in &mut prices[placeholder.clone()] {
            *price = Some(last_price);
        }
        extended.insert_column(target, prices)?;

        let features = self.builder.build(&extended, Some(target))?;
        let future_rows = features
            .slice(placeholder.start, placeholder.end)
            .forward_fill()?
            .fill_missing(0.0)?;

        let predicted = ensemble::predict(ensemble, &future_rows)?;
        debug!(
            "Forecast {} days from {} to {}",
            horizon,
            dates[0],
            dates[horizon - 1]
        );
        ForecastTable::new(&dates, &predicted)
    }

    /// Fill missing derived weather cells from the raw columns
    fn fill_derived_weather(&self, frame: &mut Frame) -> Result<()> {
        let raw: Vec<&str> = WeatherAttribute::RAW.iter().map(|a| a.column_name()).collect();
        let derived = with_derived_weather(
            &frame.select(&raw)?,
            &self.config.degree_days,
            self.config.drought_window,
        )?;

        for attribute in WeatherAttribute::DERIVED {
            let name = attribute.column_name();
            let computed = derived.require_column(name)?;
            let values = match frame.column(name) {
                Some(existing) => existing
                    .into_iter()
                    .zip(computed)
                    .map(|(e, c)| e.or(c))
                    .collect(),
                None => computed,
            };
            frame.insert_column(name, values)?;
        }
        Ok(())
    }
}
