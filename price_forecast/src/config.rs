//! Ensemble configuration and compile-time capabilities

use crate::data::DEFAULT_TARGET_COLUMN;
use crate::error::{ForecastError, Result};
use crate::weather::CommodityType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use weather_math::{DegreeDayBases, DEFAULT_DROUGHT_WINDOW};

/// Random forest settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestConfig {
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub seed: u64,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(10),
            seed: 42,
        }
    }
}

/// Gradient boosting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
    pub min_samples_leaf: usize,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
        }
    }
}

/// ARIMA(p, d, q) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 2, d: 1, q: 2 }
    }
}

/// Echo state network settings for the sequence model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub enabled: bool,
    pub lookback: usize,
    pub reservoir_size: usize,
    pub spectral_radius: f64,
    pub leak_rate: f64,
    pub input_scaling: f64,
    pub ridge_alpha: f64,
    pub seed: u64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback: 30,
            reservoir_size: 50,
            spectral_radius: 0.9,
            leak_rate: 0.3,
            input_scaling: 0.5,
            ridge_alpha: 1e-2,
            seed: 42,
        }
    }
}

/// Everything the forecaster needs to know besides the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub commodity: CommodityType,
    pub target_column: String,
    pub cv_folds: usize,
    pub random_forest: RandomForestConfig,
    pub gradient_boosting: GradientBoostingConfig,
    pub ridge_alpha: f64,
    pub arima: ArimaOrder,
    pub sequence: SequenceConfig,
    pub drought_window: usize,
    pub degree_days: DegreeDayBases,
    /// Seed of the climatology used for future weather
    pub weather_seed: u64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            commodity: CommodityType::Agricultural,
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            cv_folds: 3,
            random_forest: RandomForestConfig::default(),
            gradient_boosting: GradientBoostingConfig::default(),
            ridge_alpha: 1.0,
            arima: ArimaOrder::default(),
            sequence: SequenceConfig::default(),
            drought_window: DEFAULT_DROUGHT_WINDOW,
            degree_days: DegreeDayBases::default(),
            weather_seed: 7,
        }
    }
}

impl EnsembleConfig {
    /// Default configuration for a commodity
    pub fn new(commodity: CommodityType) -> Self {
        Self {
            commodity,
            ..Self::default()
        }
    }

    pub fn with_target_column(mut self, name: &str) -> Self {
        self.target_column = name.to_string();
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_forest(mut self, config: RandomForestConfig) -> Self {
        self.random_forest = config;
        self
    }

    pub fn with_gradient_boosting(mut self, config: GradientBoostingConfig) -> Self {
        self.gradient_boosting = config;
        self
    }

    pub fn with_ridge_alpha(mut self, alpha: f64) -> Self {
        self.ridge_alpha = alpha;
        self
    }

    pub fn with_arima(mut self, order: ArimaOrder) -> Self {
        self.arima = order;
        self
    }

    pub fn with_sequence(mut self, config: SequenceConfig) -> Self {
        self.sequence = config;
        self
    }

    pub fn with_drought_window(mut self, window: usize) -> Self {
        self.drought_window = window;
        self
    }

    pub fn with_degree_days(mut self, bases: DegreeDayBases) -> Self {
        self.degree_days = bases;
        self
    }

    pub fn with_weather_seed(mut self, seed: u64) -> Self {
        self.weather_seed = seed;
        self
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(ForecastError::ValidationError(msg.to_string()));

        if self.target_column.is_empty() {
            return invalid("Target column name must not be empty");
        }
        if self.cv_folds < 2 {
            return invalid("Cross-validation needs at least 2 folds");
        }
        if self.random_forest.n_trees == 0 {
            return invalid("Random forest needs at least one tree");
        }
        if self.random_forest.max_depth == Some(0) {
            return invalid("Random forest tree depth must be positive");
        }
        if self.gradient_boosting.n_rounds == 0 {
            return invalid("Gradient boosting needs at least one round");
        }
        if !(self.gradient_boosting.learning_rate > 0.0 && self.gradient_boosting.learning_rate <= 1.0) {
            return invalid("Gradient boosting learning rate must be in (0, 1]");
        }
        if self.gradient_boosting.max_depth == 0 {
            return invalid("Gradient boosting tree depth must be positive");
        }
        if !(self.ridge_alpha >= 0.0) {
            return invalid("Ridge alpha must be non-negative");
        }
        if self.arima.d > 2 {
            return invalid("ARIMA differencing order above 2 is not supported");
        }
        if self.sequence.lookback == 0 || self.sequence.reservoir_size == 0 {
            return invalid("Sequence lookback and reservoir size must be positive");
        }
        if !(self.sequence.leak_rate > 0.0 && self.sequence.leak_rate <= 1.0) {
            return invalid("Sequence leak rate must be in (0, 1]");
        }
        if !(self.sequence.spectral_radius > 0.0) {
            return invalid("Sequence spectral radius must be positive");
        }
        if !(self.sequence.input_scaling.is_finite() && self.sequence.input_scaling >= 0.0) {
            return invalid("Sequence input scaling must be finite and non-negative");
        }
        if self.drought_window == 0 {
            return invalid("Drought window must be positive");
        }
        Ok(())
    }
}

/// Optional models available in this build, resolved once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub sequence_model: bool,
}

impl Capabilities {
    pub fn detect() -> Self {
        Self {
            sequence_model: cfg!(feature = "sequence"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EnsembleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cv_folds, 3);
        assert_eq!(config.arima, ArimaOrder { p: 2, d: 1, q: 2 });
        assert_eq!(config.sequence.lookback, 30);
        assert_eq!(config.drought_window, 30);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            EnsembleConfig::from_json_str(r#"{"commodity": "energy", "cv_folds": 4}"#).unwrap();
        assert_eq!(config.commodity, CommodityType::Energy);
        assert_eq!(config.cv_folds, 4);
        assert_eq!(config.target_column, DEFAULT_TARGET_COLUMN);
    }

    #[test]
    fn test_invalid_json_values_are_rejected() {
        assert!(EnsembleConfig::from_json_str(r#"{"cv_folds": 1}"#).is_err());
        assert!(EnsembleConfig::from_json_str(r#"{"ridge_alpha": -1.0}"#).is_err());
        assert!(EnsembleConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_degenerate_model_parameters_are_rejected() {
        let negative_scaling = EnsembleConfig::from_json_str(r#"{"sequence": {"input_scaling": -0.5}}"#);
        assert!(matches!(negative_scaling, Err(ForecastError::ValidationError(_))));

        let mut config = EnsembleConfig::default();
        config.random_forest.max_depth = Some(0);
        assert!(matches!(config.validate(), Err(ForecastError::ValidationError(_))));

        config.random_forest.max_depth = None;
        config.sequence.input_scaling = f64::NAN;
        assert!(matches!(config.validate(), Err(ForecastError::ValidationError(_))));

        config.sequence.input_scaling = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let config = EnsembleConfig::new(CommodityType::Energy).with_ridge_alpha(0.5);
        let parsed = EnsembleConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_capabilities_follow_feature() {
        assert_eq!(Capabilities::detect().sequence_model, cfg!(feature = "sequence"));
    }
}
