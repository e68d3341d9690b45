use price_forecast::config::{EnsembleConfig, RandomForestConfig};
use price_forecast::{CommodityType, ForecastError, WeatherPriceForecaster};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_config_from_json_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{
            "commodity": "energy",
            "random_forest": {{"n_trees": 25}},
            "arima": {{"p": 1, "d": 1, "q": 1}},
            "sequence": {{"enabled": false}}
        }}"#
    )
    .unwrap();

    let config = EnsembleConfig::from_json_file(file.path()).unwrap();

    assert_eq!(config.commodity, CommodityType::Energy);
    assert_eq!(config.random_forest.n_trees, 25);
    assert_eq!(config.random_forest.max_depth, RandomForestConfig::default().max_depth);
    assert_eq!(config.arima.q, 1);
    assert!(!config.sequence.enabled);
    assert_eq!(config.sequence.lookback, 30);
}

#[test]
fn test_missing_config_file() {
    assert!(matches!(
        EnsembleConfig::from_json_file("no_such_config.json"),
        Err(ForecastError::IoError(_))
    ));
}

#[test]
fn test_forecaster_rejects_invalid_config() {
    let config = EnsembleConfig::new(CommodityType::Agricultural).with_cv_folds(0);
    assert!(matches!(
        WeatherPriceForecaster::with_config(config),
        Err(ForecastError::ValidationError(_))
    ));

    let config = EnsembleConfig::new(CommodityType::Energy).with_drought_window(10);
    let forecaster = WeatherPriceForecaster::with_config(config).unwrap();
    assert_eq!(forecaster.commodity(), CommodityType::Energy);
    assert_eq!(forecaster.config().drought_window, 10);
}
