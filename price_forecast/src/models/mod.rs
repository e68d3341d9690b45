//! Per-model trainers for the ensemble
//!
//! Feature regressors implement [`RegressionModel`]: training consumes a
//! row-major feature matrix and the target, and yields a boxed
//! [`TrainedRegressor`]. The ARIMA and sequence models have their own
//! training entry points because they consume the price series and
//! feature windows respectively.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fmt;

pub mod arima;
pub mod linear;
pub mod optimize;
#[cfg(feature = "sequence")]
pub mod sequence;
pub mod tree;

pub use arima::{ArimaFit, ArimaModel};
pub use linear::{LinearModel, RidgeModel};
#[cfg(feature = "sequence")]
pub use sequence::{SequenceFit, SequenceModel};
pub use tree::{GradientBoostingModel, RandomForestModel};

/// Identifier of a model family in the ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    GradientBoosting,
    LinearRegression,
    Ridge,
    Arima,
    Sequence,
}

impl ModelKind {
    /// Models trained on the engineered feature matrix, in training order
    pub const FEATURE_MODELS: [ModelKind; 4] = [
        ModelKind::RandomForest,
        ModelKind::GradientBoosting,
        ModelKind::LinearRegression,
        ModelKind::Ridge,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::GradientBoosting => "gradient_boosting",
            ModelKind::LinearRegression => "linear_regression",
            ModelKind::Ridge => "ridge",
            ModelKind::Arima => "arima",
            ModelKind::Sequence => "sequence",
        }
    }

    /// Feature scaling the model is trained and applied with
    pub fn scaling(&self) -> FeatureScaling {
        match self {
            ModelKind::RandomForest | ModelKind::GradientBoosting | ModelKind::Arima => {
                FeatureScaling::Raw
            }
            ModelKind::LinearRegression | ModelKind::Ridge | ModelKind::Sequence => {
                FeatureScaling::Standardized
            }
        }
    }

    /// Whether the model receives a cross-validated ensemble weight
    pub fn is_cross_validated(&self) -> bool {
        Self::FEATURE_MODELS.contains(self)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Feature representation a model consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureScaling {
    Raw,
    Standardized,
}

/// An untrained feature regressor with its hyperparameters
pub trait RegressionModel {
    fn kind(&self) -> ModelKind;

    /// Fit on row-major features `x` and target `y`
    fn train(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Box<dyn TrainedRegressor>>;
}

/// A fitted feature regressor
pub trait TrainedRegressor: fmt::Debug + Send + Sync {
    fn kind(&self) -> ModelKind;

    /// One prediction per row of `x`
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;
}

/// Row-major rows into a smartcore matrix
pub(crate) fn to_matrix(rows: &[Vec<f64>]) -> Result<DenseMatrix<f64>> {
    if rows.is_empty() {
        return Err(ForecastError::DataError("Empty feature matrix".to_string()));
    }
    let slices: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
    Ok(DenseMatrix::from_2d_array(&slices)?)
}

pub(crate) fn check_training_shape(x: &[Vec<f64>], y: &[f64], min_rows: usize) -> Result<()> {
    if x.len() != y.len() {
        return Err(ForecastError::DataError(format!(
            "Feature rows ({}) and targets ({}) differ in length",
            x.len(),
            y.len()
        )));
    }
    if x.len() < min_rows {
        return Err(ForecastError::InsufficientData {
            needed: min_rows,
            got: x.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_feature_models_are_cross_validated() {
        assert!(ModelKind::Ridge.is_cross_validated());
        assert!(ModelKind::RandomForest.is_cross_validated());
        assert!(!ModelKind::Arima.is_cross_validated());
        assert!(!ModelKind::Sequence.is_cross_validated());
    }

    #[test]
    fn test_scaling_by_family() {
        assert_eq!(ModelKind::GradientBoosting.scaling(), FeatureScaling::Raw);
        assert_eq!(ModelKind::LinearRegression.scaling(), FeatureScaling::Standardized);
    }

    #[test]
    fn test_shape_checks() {
        assert!(to_matrix(&[]).is_err());
        assert!(check_training_shape(&[vec![1.0]], &[1.0, 2.0], 1).is_err());
        assert!(matches!(
            check_training_shape(&[vec![1.0]], &[1.0], 2),
            Err(ForecastError::InsufficientData { needed: 2, got: 1 })
        ));
    }
}
