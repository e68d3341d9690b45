//! Accuracy metrics for held-out predictions

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error metrics of the ensemble on the test split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Coefficient of determination
    pub r2: f64,
    /// Mean Absolute Percentage Error, in percent
    pub mape: f64,
}

impl EvaluationMetrics {
    /// Metrics keyed by their short names
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("MAE", self.mae),
            ("RMSE", self.rmse),
            ("R2", self.r2),
            ("MAPE", self.mape),
        ])
    }
}

impl std::fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Evaluation Metrics:")?;
        writeln!(f, "  MAE:  {:.4}", self.mae)?;
        writeln!(f, "  RMSE: {:.4}", self.rmse)?;
        writeln!(f, "  R2:   {:.4}", self.r2)?;
        writeln!(f, "  MAPE: {:.4}%", self.mape)?;
        Ok(())
    }
}

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::ValidationError(
            "Actual and predicted values must have the same non-zero length".to_string(),
        ));
    }
    Ok(())
}

/// Coefficient of determination, 1 - SS_res / SS_tot.
///
/// A constant `actual` series gives 1 for a perfect fit and 0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// MAE, RMSE, R2 and MAPE of `predicted` against `actual`.
///
/// MAPE divides by the actual value and is left infinite or NaN when an
/// actual value is zero.
pub fn evaluate_predictions(actual: &[f64], predicted: &[f64]) -> Result<EvaluationMetrics> {
    check_lengths(actual, predicted)?;
    let n = actual.len() as f64;

    let errors: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let rmse = (errors.iter().map(|e| e.powi(2)).sum::<f64>() / n).sqrt();
    let mape = actual
        .iter()
        .zip(&errors)
        .map(|(a, e)| (e / a).abs())
        .sum::<f64>()
        / n
        * 100.0;

    Ok(EvaluationMetrics {
        mae,
        rmse,
        r2: r2_score(actual, predicted)?,
        mape,
    })
}
