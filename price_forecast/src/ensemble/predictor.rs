//! Blending the fitted models into one prediction per row

use crate::data::Frame;
use crate::ensemble::FittedEnsemble;
use crate::error::{ForecastError, Result};
use crate::models::{FeatureScaling, ModelKind};
use log::warn;
use std::collections::BTreeMap;

/// Each available model's prediction for every row of `features`.
///
/// Feature regressors see the columns in training order, raw or scaled
/// with the training scaler. ARIMA repeats its last in-sample fitted
/// value. The sequence model sees each scaled row as a one-step window.
/// A model whose prediction fails is logged and omitted.
pub fn predict_components(
    ensemble: &FittedEnsemble,
    features: &Frame,
) -> Result<BTreeMap<ModelKind, Vec<f64>>> {
    let raw = features.to_rows(ensemble.feature_columns())?;
    let scaled = ensemble.scaler().transform(&raw)?;
    let rows = raw.len();

    let mut components = BTreeMap::new();
    let mut record = |kind: ModelKind, outcome: Result<Vec<f64>>| match outcome {
        Ok(values) if values.len() == rows => {
            components.insert(kind, values);
        }
        Ok(values) => warn!(
            "{} returned {} predictions for {} rows, ignoring",
            kind,
            values.len(),
            rows
        ),
        Err(e) => warn!("Prediction with {} failed: {}", kind, e),
    };

    for kind in ModelKind::FEATURE_MODELS {
        if let Some(model) = ensemble.regressor(kind) {
            let x = match kind.scaling() {
                FeatureScaling::Raw => &raw,
                FeatureScaling::Standardized => &scaled,
            };
            record(kind, model.predict(x));
        }
    }

    if let Some(arima) = ensemble.arima() {
        record(ModelKind::Arima, Ok(vec![arima.last_fitted_value(); rows]));
    }

    #[cfg(feature = "sequence")]
    if let Some(sequence) = ensemble.sequence() {
        record(ModelKind::Sequence, sequence.predict_rows(&scaled));
    }

    Ok(components)
}

/// One blended price per row of `features`.
///
/// The blend is the weight-averaged prediction over the models that
/// produced output, renormalized by the weights actually used. When the
/// models that answered all have zero weight their plain mean is used.
pub fn predict(ensemble: &FittedEnsemble, features: &Frame) -> Result<Vec<f64>> {
    let components = predict_components(ensemble, features)?;
    blend(&components, |kind| ensemble.weights().get(kind), features.len())
}

/// Weighted average of model outputs
pub fn blend<W>(components: &BTreeMap<ModelKind, Vec<f64>>, weight: W, rows: usize) -> Result<Vec<f64>>
where
    W: Fn(ModelKind) -> f64,
{
    if components.is_empty() {
        return Err(ForecastError::NoModelAvailable);
    }

    let used: f64 = components.keys().map(|&k| weight(k)).sum();
    let unweighted = used <= 0.0;
    let total = if unweighted {
        components.len() as f64
    } else {
        used
    };

    let mut blended = vec![0.0; rows];
    for (&kind, values) in components {
        let w = if unweighted { 1.0 } else { weight(kind) };
        if w == 0.0 {
            continue;
        }
        for (b, v) in blended.iter_mut().zip(values) {
            *b += w * v;
        }
    }
    Ok(blended.into_iter().map(|b| b / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_renormalizes_over_answering_models() {
        let components = BTreeMap::from([
            (ModelKind::RandomForest, vec![10.0, 20.0]),
            (ModelKind::Ridge, vec![30.0, 40.0]),
        ]);
        // gradient boosting carries weight but did not answer
        let weight = |kind: ModelKind| match kind {
            ModelKind::RandomForest => 0.25,
            ModelKind::Ridge => 0.25,
            _ => 0.5,
        };
        let blended = blend(&components, weight, 2).unwrap();
        assert_eq!(blended, vec![20.0, 30.0]);
    }

    #[test]
    fn test_zero_weight_models_fall_back_to_mean() {
        let components = BTreeMap::from([
            (ModelKind::Arima, vec![5.0]),
            (ModelKind::Sequence, vec![7.0]),
        ]);
        let blended = blend(&components, |_| 0.0, 1).unwrap();
        assert_eq!(blended, vec![6.0]);
    }

    #[test]
    fn test_zero_weight_models_are_ignored_when_others_weigh() {
        let components = BTreeMap::from([
            (ModelKind::Arima, vec![1000.0]),
            (ModelKind::LinearRegression, vec![7.0]),
        ]);
        let weight = |kind: ModelKind| if kind == ModelKind::LinearRegression { 1.0 } else { 0.0 };
        assert_eq!(blend(&components, weight, 1).unwrap(), vec![7.0]);
    }

    #[test]
    fn test_nothing_to_blend() {
        assert!(matches!(
            blend(&BTreeMap::new(), |_| 1.0, 3),
            Err(ForecastError::NoModelAvailable)
        ));
    }
}
