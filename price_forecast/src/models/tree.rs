//! Tree-ensemble regressors on unscaled features

use crate::config::{GradientBoostingConfig, RandomForestConfig};
use crate::error::{ForecastError, Result};
use crate::models::{check_training_shape, to_matrix, ModelKind, RegressionModel, TrainedRegressor};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use std::fmt;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Bagged regression trees
#[derive(Debug, Clone, Default)]
pub struct RandomForestModel {
    config: RandomForestConfig,
}

impl RandomForestModel {
    pub fn new(config: RandomForestConfig) -> Self {
        Self { config }
    }
}

impl RegressionModel for RandomForestModel {
    fn kind(&self) -> ModelKind {
        ModelKind::RandomForest
    }

    fn train(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Box<dyn TrainedRegressor>> {
        if self.config.n_trees == 0 || self.config.max_depth == Some(0) {
            return Err(ForecastError::ModelError(
                "Random forest needs at least one tree of positive depth".to_string(),
            ));
        }
        check_training_shape(x, y, 2)?;
        let matrix = to_matrix(x)?;

        let mut parameters = RandomForestRegressorParameters::default()
            .with_n_trees(self.config.n_trees)
            .with_seed(self.config.seed);
        if let Some(depth) = self.config.max_depth {
            parameters = parameters.with_max_depth(depth);
        }

        let forest = RandomForestRegressor::fit(&matrix, &y.to_vec(), parameters)?;
        Ok(Box::new(TrainedRandomForest { forest }))
    }
}

struct TrainedRandomForest {
    forest: Forest,
}

impl fmt::Debug for TrainedRandomForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedRandomForest").finish_non_exhaustive()
    }
}

impl TrainedRegressor for TrainedRandomForest {
    fn kind(&self) -> ModelKind {
        ModelKind::RandomForest
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(self.forest.predict(&to_matrix(x)?)?)
    }
}

/// Least-squares gradient boosting of shallow regression trees.
///
/// Starts from the target mean; each round fits a tree to the current
/// residuals and adds it with the configured shrinkage.
#[derive(Debug, Clone, Default)]
pub struct GradientBoostingModel {
    config: GradientBoostingConfig,
}

impl GradientBoostingModel {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self { config }
    }
}

impl RegressionModel for GradientBoostingModel {
    fn kind(&self) -> ModelKind {
        ModelKind::GradientBoosting
    }

    fn train(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Box<dyn TrainedRegressor>> {
        if self.config.max_depth == 0 {
            return Err(ForecastError::ModelError(
                "Gradient boosting tree depth must be positive".to_string(),
            ));
        }
        check_training_shape(x, y, 2)?;
        let matrix = to_matrix(x)?;

        let base = y.iter().sum::<f64>() / y.len() as f64;
        let mut fitted = vec![base; y.len()];
        let mut trees = Vec::with_capacity(self.config.n_rounds);

        let parameters = DecisionTreeRegressorParameters::default()
            .with_max_depth(self.config.max_depth)
            .with_min_samples_leaf(self.config.min_samples_leaf);

        for _ in 0..self.config.n_rounds {
            let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(t, f)| t - f).collect();
            let tree = Tree::fit(&matrix, &residuals, parameters.clone())?;
            let step = tree.predict(&matrix)?;
            for (f, s) in fitted.iter_mut().zip(step) {
                *f += self.config.learning_rate * s;
            }
            trees.push(tree);
        }

        Ok(Box::new(TrainedGradientBoosting {
            base,
            learning_rate: self.config.learning_rate,
            trees,
        }))
    }
}

struct TrainedGradientBoosting {
    base: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
}

impl fmt::Debug for TrainedGradientBoosting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedGradientBoosting")
            .field("base", &self.base)
            .field("learning_rate", &self.learning_rate)
            .field("rounds", &self.trees.len())
            .finish()
    }
}

impl TrainedRegressor for TrainedGradientBoosting {
    fn kind(&self) -> ModelKind {
        ModelKind::GradientBoosting
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let matrix = to_matrix(x)?;
        let mut predictions = vec![self.base; x.len()];
        for tree in &self.trees {
            for (p, s) in predictions.iter_mut().zip(tree.predict(&matrix)?) {
                *p += self.learning_rate * s;
            }
        }
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::r2_score;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64, (i % 5) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| if r[0] < 30.0 { 1.0 } else { 5.0 } + r[1]).collect();
        (x, y)
    }

    #[test]
    fn test_random_forest_fits_step() {
        let (x, y) = step_data();
        let model = RandomForestModel::new(RandomForestConfig {
            n_trees: 20,
            max_depth: Some(6),
            seed: 1,
        })
        .train(&x, &y)
        .unwrap();

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions.len(), x.len());
        assert!(r2_score(&y, &predictions).unwrap() > 0.8);
    }

    #[test]
    fn test_boosting_reduces_error() {
        let (x, y) = step_data();
        let model = GradientBoostingModel::new(GradientBoostingConfig {
            n_rounds: 50,
            learning_rate: 0.2,
            max_depth: 3,
            min_samples_leaf: 1,
        })
        .train(&x, &y)
        .unwrap();

        assert_eq!(model.kind(), ModelKind::GradientBoosting);
        let predictions = model.predict(&x).unwrap();
        assert!(r2_score(&y, &predictions).unwrap() > 0.95);
    }

    #[test]
    fn test_zero_depth_is_a_model_error() {
        let (x, y) = step_data();
        let forest = RandomForestModel::new(RandomForestConfig {
            n_trees: 5,
            max_depth: Some(0),
            seed: 1,
        })
        .train(&x, &y);
        assert!(matches!(forest, Err(ForecastError::ModelError(_))));

        let boosting = GradientBoostingModel::new(GradientBoostingConfig {
            max_depth: 0,
            ..GradientBoostingConfig::default()
        })
        .train(&x, &y);
        assert!(matches!(boosting, Err(ForecastError::ModelError(_))));
    }

    #[test]
    fn test_too_few_rows() {
        assert!(GradientBoostingModel::default().train(&[vec![1.0]], &[1.0]).is_err());
    }
}
