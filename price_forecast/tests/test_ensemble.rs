use assert_approx_eq::assert_approx_eq;
use chrono::NaiveDate;
use price_forecast::config::{
    ArimaOrder, EnsembleConfig, GradientBoostingConfig, RandomForestConfig, SequenceConfig,
};
use price_forecast::ensemble::{predict_components, predictor::blend};
use price_forecast::{CommodityType, ForecastError, ModelKind, WeatherPriceForecaster};
use rstest::rstest;
use std::collections::BTreeMap;

fn quick_config(commodity: CommodityType) -> EnsembleConfig {
    EnsembleConfig::new(commodity)
        .with_random_forest(RandomForestConfig {
            n_trees: 15,
            max_depth: Some(6),
            seed: 1,
        })
        .with_gradient_boosting(GradientBoostingConfig {
            n_rounds: 25,
            learning_rate: 0.2,
            max_depth: 3,
            min_samples_leaf: 2,
        })
        .with_sequence(SequenceConfig {
            lookback: 10,
            reservoir_size: 20,
            ..SequenceConfig::default()
        })
}

fn fitted(commodity: CommodityType, days: usize) -> WeatherPriceForecaster {
    fitted_with(quick_config(commodity), days)
}

fn fitted_with(config: EnsembleConfig, days: usize) -> WeatherPriceForecaster {
    let mut forecaster = WeatherPriceForecaster::with_config(config).unwrap();
    let history = forecaster
        .generate_synthetic_data(days, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        .unwrap();
    forecaster.fit(&history, "commodity_price", 0.2).unwrap();
    forecaster
}

#[rstest]
#[case(CommodityType::Agricultural)]
#[case(CommodityType::Energy)]
fn test_weights_sum_to_one(#[case] commodity: CommodityType) {
    let forecaster = fitted(commodity, 400);
    let weights = forecaster.weights().unwrap();
    let scores = forecaster.cv_scores().unwrap();

    assert!(!weights.is_empty());
    assert_approx_eq!(weights.total(), 1.0, 1e-9);
    for (kind, weight) in weights.iter() {
        assert!(weight >= 0.0);
        assert!(kind.is_cross_validated());
        assert!(scores.contains_key(&kind));
    }
    assert_eq!(weights.get(ModelKind::Arima), 0.0);
    assert_eq!(weights.get(ModelKind::Sequence), 0.0);
}

#[test]
fn test_every_model_trains_on_synthetic_data() {
    let forecaster = fitted(CommodityType::Agricultural, 400);
    let ensemble = forecaster.fitted().unwrap();
    let available = ensemble.available_models();

    for kind in ModelKind::FEATURE_MODELS {
        assert!(available.contains(&kind), "{} missing", kind);
    }
    assert!(available.contains(&ModelKind::Arima));
    assert_eq!(
        available.contains(&ModelKind::Sequence),
        cfg!(feature = "sequence")
    );
}

#[test]
fn test_predict_returns_one_value_per_row() {
    let forecaster = fitted(CommodityType::Energy, 300);
    let ensemble = forecaster.fitted().unwrap();
    let test = ensemble.test_split();

    let predictions = forecaster.predict(test).unwrap();
    assert_eq!(predictions.len(), test.len());
    assert!(predictions.iter().all(|p| p.is_finite()));

    let components = predict_components(&ensemble, test).unwrap();
    for values in components.values() {
        assert_eq!(values.len(), test.len());
    }
    // ARIMA repeats one value
    let arima = &components[&ModelKind::Arima];
    assert!(arima.iter().all(|v| *v == arima[0]));
}

#[test]
fn test_untrainable_models_are_left_out() {
    // 300 days cannot carry an AR order of 400 or a 400-row lookback
    let config = quick_config(CommodityType::Energy)
        .with_arima(ArimaOrder { p: 400, d: 1, q: 0 })
        .with_sequence(SequenceConfig {
            lookback: 400,
            reservoir_size: 20,
            ..SequenceConfig::default()
        });
    let forecaster = fitted_with(config, 300);
    let ensemble = forecaster.fitted().unwrap();

    let available = ensemble.available_models();
    assert!(!available.contains(&ModelKind::Arima));
    assert!(!available.contains(&ModelKind::Sequence));
    for kind in ModelKind::FEATURE_MODELS {
        assert!(available.contains(&kind), "{} missing", kind);
    }

    let test = ensemble.test_split();
    let components = predict_components(&ensemble, test).unwrap();
    assert!(!components.contains_key(&ModelKind::Arima));
    assert!(!components.contains_key(&ModelKind::Sequence));

    let predictions = forecaster.predict(test).unwrap();
    assert_eq!(predictions.len(), test.len());
    assert!(predictions.iter().all(|p| p.is_finite()));
    assert_approx_eq!(forecaster.weights().unwrap().total(), 1.0, 1e-9);
}

#[test]
fn test_disabled_sequence_matches_missing_capability() {
    let enabled = fitted(CommodityType::Agricultural, 300);
    let disabled = fitted_with(
        quick_config(CommodityType::Agricultural).with_sequence(SequenceConfig {
            enabled: false,
            lookback: 10,
            reservoir_size: 20,
            ..SequenceConfig::default()
        }),
        300,
    );
    let ensemble = disabled.fitted().unwrap();

    assert!(!ensemble.available_models().contains(&ModelKind::Sequence));
    let components = predict_components(&ensemble, ensemble.test_split()).unwrap();
    assert!(!components.contains_key(&ModelKind::Sequence));
    assert!(components.contains_key(&ModelKind::Arima));

    // the sequence model never takes part in cross-validation
    assert_eq!(disabled.weights(), enabled.weights());
    assert_eq!(disabled.cv_scores(), enabled.cv_scores());
}

#[test]
fn test_predict_needs_training_columns() {
    let forecaster = fitted(CommodityType::Energy, 300);
    let ensemble = forecaster.fitted().unwrap();
    let partial = ensemble
        .test_split()
        .select(&["temperature", "humidity"])
        .unwrap();

    assert!(matches!(
        forecaster.predict(&partial),
        Err(ForecastError::DataError(_))
    ));
}

#[test]
fn test_blend_without_models() {
    assert!(matches!(
        blend(&BTreeMap::new(), |_| 1.0, 5),
        Err(ForecastError::NoModelAvailable)
    ));
}

#[test]
fn test_refit_replaces_snapshot() {
    let mut forecaster = fitted(CommodityType::Agricultural, 300);
    let before = forecaster.fitted().unwrap();

    let history = forecaster
        .generate_synthetic_data(350, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap())
        .unwrap();
    forecaster.fit(&history, "commodity_price", 0.25).unwrap();
    let after = forecaster.fitted().unwrap();

    assert!(!std::sync::Arc::ptr_eq(&before, &after));
    // the earlier snapshot stays intact for whoever still holds it
    assert_eq!(before.train_split().len() + before.test_split().len(), 300 - 30);
    assert_eq!(after.train_split().len() + after.test_split().len(), 350 - 30);
}
