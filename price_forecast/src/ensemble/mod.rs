//! The fitted ensemble and how it is trained
//!
//! A [`FittedEnsemble`] is built once per fit and never modified; the
//! forecaster swaps in a new one on the next fit.

use crate::config::{Capabilities, EnsembleConfig};
use crate::data::Frame;
use crate::error::{ForecastError, Result};
use crate::models::{
    ArimaFit, ArimaModel, GradientBoostingModel, LinearModel, ModelKind, RandomForestModel,
    RegressionModel, RidgeModel, TrainedRegressor,
};
#[cfg(feature = "sequence")]
use crate::models::{SequenceFit, SequenceModel};
use crate::scaling::StandardScaler;
use log::{info, warn};
use std::collections::BTreeMap;

pub mod predictor;
pub mod weighting;

pub use predictor::{predict, predict_components};
pub use weighting::{forward_chaining_splits, EnsembleWeights, TrainingMatrices};

#[cfg(feature = "sequence")]
type SequenceSlot = Option<SequenceFit>;
#[cfg(not(feature = "sequence"))]
type SequenceSlot = Option<std::convert::Infallible>;

/// Everything one fit produced
#[derive(Debug)]
pub struct FittedEnsemble {
    target_column: String,
    feature_columns: Vec<String>,
    scaler: StandardScaler,
    regressors: BTreeMap<ModelKind, Box<dyn TrainedRegressor>>,
    arima: Option<ArimaFit>,
    sequence: SequenceSlot,
    cv_scores: BTreeMap<ModelKind, f64>,
    weights: EnsembleWeights,
    train: Frame,
    test: Frame,
}

/// Untrained feature regressors for a configuration, in training order
pub fn feature_models(config: &EnsembleConfig) -> Vec<Box<dyn RegressionModel>> {
    ModelKind::FEATURE_MODELS
        .iter()
        .map(|kind| -> Box<dyn RegressionModel> {
            match kind {
                ModelKind::RandomForest => Box::new(RandomForestModel::new(config.random_forest.clone())),
                ModelKind::GradientBoosting => {
                    Box::new(GradientBoostingModel::new(config.gradient_boosting.clone()))
                }
                ModelKind::LinearRegression => Box::new(LinearModel),
                _ => Box::new(RidgeModel::new(config.ridge_alpha)),
            }
        })
        .collect()
}

impl FittedEnsemble {
    /// Train every model, score the feature regressors and derive weights.
    ///
    /// `train` and `test` are complete feature rows; `prices` is the full
    /// price series in date order, used by the ARIMA model. A model that
    /// fails to train is logged and left out. Fails only when no model
    /// trains at all.
    pub fn fit(
        config: &EnsembleConfig,
        capabilities: Capabilities,
        feature_columns: Vec<String>,
        train: Frame,
        test: Frame,
        prices: &[f64],
    ) -> Result<Self> {
        let target = config.target_column.as_str();
        let raw = train.to_rows(&feature_columns)?;
        let y = train.column_values(target)?;
        let scaler = StandardScaler::fit(&raw)?;
        let scaled = scaler.transform(&raw)?;
        let matrices = TrainingMatrices {
            raw: &raw,
            scaled: &scaled,
            target: &y,
        };

        let models = feature_models(config);
        let mut regressors = BTreeMap::new();
        for model in &models {
            let kind = model.kind();
            match model.train(matrices.features(kind.scaling()), &y) {
                Ok(fitted) => {
                    info!("Trained {}", kind);
                    regressors.insert(kind, fitted);
                }
                Err(e) => warn!("Training {} failed: {}", kind, e),
            }
        }

        let arima = match ArimaModel::new(config.arima).fit(prices) {
            Ok(fit) => {
                info!("Trained {}", ModelKind::Arima);
                Some(fit)
            }
            Err(e) => {
                warn!("Training {} failed: {}", ModelKind::Arima, e);
                None
            }
        };

        let sequence = fit_sequence(config, capabilities, &scaled, &y);

        if regressors.is_empty() && arima.is_none() && sequence.is_none() {
            return Err(ForecastError::ModelError(
                "No model could be trained".to_string(),
            ));
        }

        let scored: Vec<Box<dyn RegressionModel>> = models
            .into_iter()
            .filter(|m| regressors.contains_key(&m.kind()))
            .collect();
        let cv_scores = weighting::score_models(&scored, &matrices, config.cv_folds);
        let weights = EnsembleWeights::from_scores(&cv_scores);
        info!("Ensemble weights: {:?}", weights.as_map());

        Ok(Self {
            target_column: target.to_string(),
            feature_columns,
            scaler,
            regressors,
            arima,
            sequence,
            cv_scores,
            weights,
            train,
            test,
        })
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Feature columns in the order the models were trained on
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn regressor(&self, kind: ModelKind) -> Option<&dyn TrainedRegressor> {
        self.regressors.get(&kind).map(|r| r.as_ref())
    }

    pub fn arima(&self) -> Option<&ArimaFit> {
        self.arima.as_ref()
    }

    #[cfg(feature = "sequence")]
    pub fn sequence(&self) -> Option<&SequenceFit> {
        self.sequence.as_ref()
    }

    pub fn cv_scores(&self) -> &BTreeMap<ModelKind, f64> {
        &self.cv_scores
    }

    pub fn weights(&self) -> &EnsembleWeights {
        &self.weights
    }

    /// Training feature rows
    pub fn train_split(&self) -> &Frame {
        &self.train
    }

    /// Held-out feature rows
    pub fn test_split(&self) -> &Frame {
        &self.test
    }

    /// Models that were trained successfully
    pub fn available_models(&self) -> Vec<ModelKind> {
        let mut kinds: Vec<ModelKind> = self.regressors.keys().copied().collect();
        if self.arima.is_some() {
            kinds.push(ModelKind::Arima);
        }
        if self.sequence.is_some() {
            kinds.push(ModelKind::Sequence);
        }
        kinds
    }
}

#[cfg(feature = "sequence")]
fn fit_sequence(
    config: &EnsembleConfig,
    capabilities: Capabilities,
    scaled: &[Vec<f64>],
    y: &[f64],
) -> SequenceSlot {
    if !(capabilities.sequence_model && config.sequence.enabled) {
        info!("Sequence model disabled, skipping");
        return None;
    }
    match SequenceModel::new(config.sequence.clone()).fit(scaled, y) {
        Ok(fit) => {
            info!("Trained {}", ModelKind::Sequence);
            Some(fit)
        }
        Err(e) => {
            warn!("Training {} failed: {}", ModelKind::Sequence, e);
            None
        }
    }
}

#[cfg(not(feature = "sequence"))]
fn fit_sequence(
    _config: &EnsembleConfig,
    _capabilities: Capabilities,
    _scaled: &[Vec<f64>],
    _y: &[f64],
) -> SequenceSlot {
    info!("Sequence model not compiled in, skipping");
    None
}
