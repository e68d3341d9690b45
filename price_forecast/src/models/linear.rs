//! Linear and ridge regression on standardized features

use crate::error::{ForecastError, Result};
use crate::models::{check_training_shape, to_matrix, ModelKind, RegressionModel, TrainedRegressor};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use smartcore::linear::ridge_regression::{
    RidgeRegression, RidgeRegressionParameters, RidgeRegressionSolverName,
};
use std::fmt;

/// Ordinary least squares, solved by SVD so collinear features do not fail
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearModel;

impl RegressionModel for LinearModel {
    fn kind(&self) -> ModelKind {
        ModelKind::LinearRegression
    }

    fn train(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Box<dyn TrainedRegressor>> {
        check_training_shape(x, y, 2)?;
        let parameters =
            LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);
        let model = LinearRegression::fit(&to_matrix(x)?, &y.to_vec(), parameters)?;
        Ok(Box::new(TrainedLinear { model }))
    }
}

struct TrainedLinear {
    model: LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>,
}

impl fmt::Debug for TrainedLinear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedLinear").finish_non_exhaustive()
    }
}

impl TrainedRegressor for TrainedLinear {
    fn kind(&self) -> ModelKind {
        ModelKind::LinearRegression
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(self.model.predict(&to_matrix(x)?)?)
    }
}

/// L2-regularized least squares
#[derive(Debug, Clone, Copy)]
pub struct RidgeModel {
    alpha: f64,
}

impl RidgeModel {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }
}

impl Default for RidgeModel {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RegressionModel for RidgeModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Ridge
    }

    fn train(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Box<dyn TrainedRegressor>> {
        check_training_shape(x, y, 2)?;

        // Center both sides so the intercept stays unpenalized; smartcore only
        // fits one when it also rescales, and rescaling rejects constant columns.
        let width = x[0].len();
        let n = x.len() as f64;
        let x_means: Vec<f64> = (0..width)
            .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / n)
            .collect();
        let y_mean = y.iter().sum::<f64>() / n;

        let centered = center(x, &x_means);
        let y_centered: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

        let parameters = RidgeRegressionParameters::default()
            .with_alpha(self.alpha)
            .with_solver(RidgeRegressionSolverName::Cholesky)
            .with_normalize(false);
        let model = RidgeRegression::fit(&to_matrix(&centered)?, &y_centered, parameters)?;

        Ok(Box::new(TrainedRidge {
            model,
            x_means,
            y_mean,
        }))
    }
}

fn center(x: &[Vec<f64>], means: &[f64]) -> Vec<Vec<f64>> {
    x.iter()
        .map(|row| row.iter().zip(means).map(|(v, m)| v - m).collect())
        .collect()
}

struct TrainedRidge {
    model: RidgeRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    x_means: Vec<f64>,
    y_mean: f64,
}

impl fmt::Debug for TrainedRidge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedRidge")
            .field("y_mean", &self.y_mean)
            .finish_non_exhaustive()
    }
}

impl TrainedRegressor for TrainedRidge {
    fn kind(&self) -> ModelKind {
        ModelKind::Ridge
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if let Some(row) = x.iter().find(|row| row.len() != self.x_means.len()) {
            return Err(ForecastError::DataError(format!(
                "Ridge expects {} features, got {}",
                self.x_means.len(),
                row.len()
            )));
        }
        let centered = to_matrix(&center(x, &self.x_means))?;
        Ok(self
            .model
            .predict(&centered)?
            .into_iter()
            .map(|p| p + self.y_mean)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64 / 10.0, ((i * 7) % 11) as f64 / 5.0])
            .collect();
        let y = x.iter().map(|r| 3.0 + 2.0 * r[0] - 1.5 * r[1]).collect();
        (x, y)
    }

    #[test]
    fn test_linear_recovers_plane() {
        let (x, y) = plane();
        let model = LinearModel.train(&x, &y).unwrap();
        let predictions = model.predict(&[vec![1.0, 1.0]]).unwrap();
        assert!((predictions[0] - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_ridge_tolerates_constant_columns() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 2020.0]).collect();
        let y: Vec<f64> = (0..10).map(|i| 1.0 + i as f64).collect();
        let model = RidgeModel::new(0.1).train(&x, &y).unwrap();
        let predictions = model.predict(&x).unwrap();
        assert!(predictions.iter().all(|p| p.is_finite()));
        assert!(model.predict(&[vec![1.0]]).is_err());
    }

    #[test]
    fn test_ridge_shrinks_toward_mean() {
        let (x, y) = plane();
        let light = RidgeModel::new(1e-6).train(&x, &y).unwrap();
        let heavy = RidgeModel::new(1e4).train(&x, &y).unwrap();

        let query = [vec![3.0, 0.0]];
        let exact = 3.0 + 2.0 * 3.0;
        let light_error = (light.predict(&query).unwrap()[0] - exact).abs();
        let heavy_error = (heavy.predict(&query).unwrap()[0] - exact).abs();
        assert!(light_error < 1e-3);
        assert!(heavy_error > light_error);
    }
}
