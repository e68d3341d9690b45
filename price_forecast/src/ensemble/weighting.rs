//! Cross-validated scoring of the feature regressors and blend weights

use crate::error::{ForecastError, Result};
use crate::metrics::r2_score;
use crate::models::{FeatureScaling, ModelKind, RegressionModel};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::ops::Range;

/// Normalized, non-negative blend weight per model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnsembleWeights {
    weights: BTreeMap<ModelKind, f64>,
}

impl EnsembleWeights {
    /// Convert cross-validation scores into weights.
    ///
    /// Negative scores count as zero and the rest are normalized to sum to
    /// one. When no score is positive every scored model gets `1 / N`.
    pub fn from_scores(scores: &BTreeMap<ModelKind, f64>) -> Self {
        if scores.is_empty() {
            return Self::default();
        }

        let clipped: BTreeMap<ModelKind, f64> = scores
            .iter()
            .map(|(&kind, &score)| (kind, if score.is_finite() { score.max(0.0) } else { 0.0 }))
            .collect();
        let total: f64 = clipped.values().sum();

        let weights = if total > 0.0 {
            clipped.into_iter().map(|(kind, s)| (kind, s / total)).collect()
        } else {
            let uniform = 1.0 / scores.len() as f64;
            scores.keys().map(|&kind| (kind, uniform)).collect()
        };

        Self { weights }
    }

    /// Weight of a model; models without a score weigh 0
    pub fn get(&self, kind: ModelKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelKind, f64)> + '_ {
        self.weights.iter().map(|(&k, &w)| (k, w))
    }

    pub fn as_map(&self) -> &BTreeMap<ModelKind, f64> {
        &self.weights
    }
}

/// Forward-chaining folds over `n` ordered rows.
///
/// Each test block has `n / (folds + 1)` rows; fold `k` trains on every
/// row before its test block, so the training prefix grows fold by fold.
pub fn forward_chaining_splits(n: usize, folds: usize) -> Result<Vec<(Range<usize>, Range<usize>)>> {
    if folds == 0 {
        return Err(ForecastError::ValidationError(
            "Cross-validation needs at least one fold".to_string(),
        ));
    }
    let test_size = n / (folds + 1);
    if test_size == 0 {
        return Err(ForecastError::InsufficientData {
            needed: folds + 1,
            got: n,
        });
    }

    let first_test = n - folds * test_size;
    Ok((0..folds)
        .map(|k| {
            let start = first_test + k * test_size;
            (0..start, start..start + test_size)
        })
        .collect())
}

/// Training matrices of one fit, raw and standardized
pub struct TrainingMatrices<'a> {
    pub raw: &'a [Vec<f64>],
    pub scaled: &'a [Vec<f64>],
    pub target: &'a [f64],
}

impl TrainingMatrices<'_> {
    pub fn features(&self, scaling: FeatureScaling) -> &[Vec<f64>] {
        match scaling {
            FeatureScaling::Raw => self.raw,
            FeatureScaling::Standardized => self.scaled,
        }
    }
}

/// Mean out-of-fold R2 of one model
pub fn cross_validate(
    model: &dyn RegressionModel,
    data: &TrainingMatrices<'_>,
    folds: usize,
) -> Result<f64> {
    let x = data.features(model.kind().scaling());
    let splits = forward_chaining_splits(x.len(), folds)?;

    let mut total = 0.0;
    for (train, test) in &splits {
        let fitted = model.train(&x[train.clone()], &data.target[train.clone()])?;
        let predictions = fitted.predict(&x[test.clone()])?;
        total += r2_score(&data.target[test.clone()], &predictions)?;
    }
    Ok(total / splits.len() as f64)
}

/// Score every model; a model whose cross-validation fails stays unscored
pub fn score_models(
    models: &[Box<dyn RegressionModel>],
    data: &TrainingMatrices<'_>,
    folds: usize,
) -> BTreeMap<ModelKind, f64> {
    let mut scores = BTreeMap::new();
    for model in models {
        match cross_validate(model.as_ref(), data, folds) {
            Ok(score) => {
                debug!("{} cross-validated R2 = {:.4}", model.kind(), score);
                scores.insert(model.kind(), score);
            }
            Err(e) => warn!("Cross-validation of {} failed: {}", model.kind(), e),
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_follow_time_series_split() {
        let splits = forward_chaining_splits(10, 3).unwrap();
        assert_eq!(
            splits,
            vec![(0..4, 4..6), (0..6, 6..8), (0..8, 8..10)]
        );
    }

    #[test]
    fn test_too_few_rows_for_folds() {
        assert!(forward_chaining_splits(3, 3).is_err());
        assert!(forward_chaining_splits(10, 0).is_err());
    }

    #[test]
    fn test_negative_scores_are_clipped() {
        let scores = BTreeMap::from([
            (ModelKind::RandomForest, 0.6),
            (ModelKind::Ridge, 0.2),
            (ModelKind::LinearRegression, -0.5),
        ]);
        let weights = EnsembleWeights::from_scores(&scores);

        assert!((weights.get(ModelKind::RandomForest) - 0.75).abs() < 1e-12);
        assert!((weights.get(ModelKind::Ridge) - 0.25).abs() < 1e-12);
        assert_eq!(weights.get(ModelKind::LinearRegression), 0.0);
        assert_eq!(weights.get(ModelKind::Arima), 0.0);
        assert!((weights.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_non_positive_scores_fall_back_to_uniform() {
        let scores = BTreeMap::from([
            (ModelKind::RandomForest, -0.1),
            (ModelKind::GradientBoosting, 0.0),
            (ModelKind::Ridge, f64::NAN),
            (ModelKind::LinearRegression, -3.0),
        ]);
        let weights = EnsembleWeights::from_scores(&scores);
        for (_, w) in weights.iter() {
            assert_eq!(w, 0.25);
        }
    }

    #[test]
    fn test_no_scores_no_weights() {
        assert!(EnsembleWeights::from_scores(&BTreeMap::new()).is_empty());
    }
}
