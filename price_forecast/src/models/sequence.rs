//! Echo state network over windows of scaled features
//!
//! A fixed random leaky-tanh reservoir is driven through each `lookback`-row
//! window; a ridge readout maps the final reservoir state to the price of
//! the row after the window. Inside the ensemble every feature row is fed
//! as a one-row window, which does not match the training windows, so the
//! sequence prediction is a rough contribution rather than a calibrated
//! forecast.

use crate::config::SequenceConfig;
use crate::error::{ForecastError, Result};
use crate::models::{check_training_shape, RegressionModel, RidgeModel, TrainedRegressor};
use log::debug;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fraction of nonzero recurrent connections
const CONNECTIVITY: f64 = 0.2;

/// Sequence model trainer
#[derive(Debug, Clone, Default)]
pub struct SequenceModel {
    config: SequenceConfig,
}

/// Fitted reservoir and readout
#[derive(Debug)]
pub struct SequenceFit {
    input_weights: Array2<f64>,
    recurrent_weights: Array2<f64>,
    leak_rate: f64,
    lookback: usize,
    readout: Box<dyn TrainedRegressor>,
}

impl SequenceModel {
    pub fn new(config: SequenceConfig) -> Self {
        Self { config }
    }

    /// Fit on standardized feature rows and the aligned target.
    ///
    /// Window `i` covers rows `i..i + lookback` and is labelled with the
    /// target of row `i + lookback`.
    pub fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<SequenceFit> {
        self.check_parameters()?;
        let lookback = self.config.lookback;
        check_training_shape(x, y, lookback + 2)?;
        let width = x[0].len();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let scale = self.config.input_scaling;
        let input_weights =
            Array2::from_shape_fn((self.config.reservoir_size, width), |_| rng.gen_range(-scale..=scale));
        let recurrent_weights = random_reservoir(
            self.config.reservoir_size,
            self.config.spectral_radius,
            &mut rng,
        );

        let mut fit = SequenceFit {
            input_weights,
            recurrent_weights,
            leak_rate: self.config.leak_rate,
            lookback,
            readout: Box::new(Untrained),
        };

        let states: Vec<Vec<f64>> = (0..x.len() - lookback)
            .map(|i| fit.final_state(&x[i..i + lookback]).to_vec())
            .collect();
        let targets = &y[lookback..];

        fit.readout = RidgeModel::new(self.config.ridge_alpha).train(&states, targets)?;

        debug!(
            "Sequence model trained on {} windows of {} rows",
            states.len(),
            lookback
        );
        Ok(fit)
    }

    fn check_parameters(&self) -> Result<()> {
        let config = &self.config;
        let problem = if config.lookback == 0 || config.reservoir_size == 0 {
            "lookback and reservoir size must be positive"
        } else if !(config.input_scaling.is_finite() && config.input_scaling >= 0.0) {
            "input scaling must be finite and non-negative"
        } else if !(config.leak_rate > 0.0 && config.leak_rate <= 1.0) {
            "leak rate must be in (0, 1]"
        } else if !(config.spectral_radius.is_finite() && config.spectral_radius > 0.0) {
            "spectral radius must be positive"
        } else {
            return Ok(());
        };
        Err(ForecastError::ModelError(format!("Sequence model {}", problem)))
    }
}

/// Sparse random matrix rescaled to the requested spectral radius
fn random_reservoir(size: usize, spectral_radius: f64, rng: &mut StdRng) -> Array2<f64> {
    let mut weights = Array2::from_shape_fn((size, size), |_| {
        if rng.gen::<f64>() < CONNECTIVITY {
            rng.gen_range(-1.0..=1.0)
        } else {
            0.0
        }
    });

    let radius = estimate_spectral_radius(&weights, rng);
    if radius > 0.0 {
        weights *= spectral_radius / radius;
    }
    weights
}

/// Geometric mean growth rate of repeated multiplication
fn estimate_spectral_radius(matrix: &Array2<f64>, rng: &mut StdRng) -> f64 {
    const WARMUP: usize = 20;
    const STEPS: usize = 100;

    let mut vector = Array1::from_shape_fn(matrix.nrows(), |_| rng.gen_range(-1.0..=1.0));
    let mut log_growth = 0.0;

    for step in 0..WARMUP + STEPS {
        let next = matrix.dot(&vector);
        let norm = next.dot(&next).sqrt();
        if norm == 0.0 {
            return 0.0;
        }
        if step >= WARMUP {
            log_growth += norm.ln();
        }
        vector = next / norm;
    }

    (log_growth / STEPS as f64).exp()
}

impl SequenceFit {
    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn reservoir_size(&self) -> usize {
        self.recurrent_weights.nrows()
    }

    fn step(&self, state: &Array1<f64>, input: ArrayView1<f64>) -> Array1<f64> {
        let activation = (self.input_weights.dot(&input) + self.recurrent_weights.dot(state)).mapv(f64::tanh);
        state * (1.0 - self.leak_rate) + activation * self.leak_rate
    }

    fn final_state(&self, window: &[Vec<f64>]) -> Array1<f64> {
        window.iter().fold(Array1::zeros(self.reservoir_size()), |state, row| {
            self.step(&state, ArrayView1::from(row.as_slice()))
        })
    }

    fn check_width(&self, rows: &[Vec<f64>]) -> Result<()> {
        let width = self.input_weights.ncols();
        match rows.iter().find(|row| row.len() != width) {
            Some(row) => Err(ForecastError::DataError(format!(
                "Sequence model expects {} features, got {}",
                width,
                row.len()
            ))),
            None => Ok(()),
        }
    }

    /// Predict the row after each full window of `rows`
    pub fn predict_windows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.check_width(rows)?;
        if rows.len() < self.lookback {
            return Ok(Vec::new());
        }
        let states: Vec<Vec<f64>> = rows
            .windows(self.lookback)
            .map(|window| self.final_state(window).to_vec())
            .collect();
        self.readout.predict(&states)
    }

    /// One prediction per row, each row fed as a one-step window
    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.check_width(rows)?;
        let states: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| self.final_state(std::slice::from_ref(row)).to_vec())
            .collect();
        self.readout.predict(&states)
    }
}

/// Placeholder readout while the reservoir states are collected
#[derive(Debug)]
struct Untrained;

impl TrainedRegressor for Untrained {
    fn kind(&self) -> crate::models::ModelKind {
        crate::models::ModelKind::Sequence
    }

    fn predict(&self, _x: &[Vec<f64>]) -> Result<Vec<f64>> {
        Err(ForecastError::NotFitted("sequence readout".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SequenceConfig {
        SequenceConfig {
            lookback: 5,
            reservoir_size: 20,
            ..SequenceConfig::default()
        }
    }

    fn sine_rows(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let t = i as f64 / 5.0;
                vec![t.sin(), t.cos()]
            })
            .collect();
        let y = x.iter().map(|r| 10.0 + 3.0 * r[0]).collect();
        (x, y)
    }

    #[test]
    fn test_spectral_radius_is_rescaled() {
        let mut rng = StdRng::seed_from_u64(1);
        let weights = random_reservoir(40, 0.8, &mut rng);
        let radius = estimate_spectral_radius(&weights, &mut rng);
        assert!((radius - 0.8).abs() < 0.1, "radius {}", radius);
    }

    #[test]
    fn test_window_and_row_predictions() {
        let (x, y) = sine_rows(120);
        let fit = SequenceModel::new(small_config()).fit(&x, &y).unwrap();

        assert_eq!(fit.predict_windows(&x).unwrap().len(), 120 - 5 + 1);
        let rows = fit.predict_rows(&x[..10]).unwrap();
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_windows_learn_the_signal() {
        let (x, y) = sine_rows(300);
        let fit = SequenceModel::new(small_config()).fit(&x, &y).unwrap();

        // window i..i+5 is labelled with row i+5; the last window has no label
        let predictions = fit.predict_windows(&x).unwrap();
        let errors: f64 = predictions[..predictions.len() - 1]
            .iter()
            .zip(&y[5..])
            .map(|(p, t)| (p - t).abs())
            .sum::<f64>()
            / (predictions.len() - 1) as f64;
        assert!(errors < 1.0, "mean error {}", errors);
    }

    #[test]
    fn test_negative_input_scaling_is_a_model_error() {
        let (x, y) = sine_rows(60);
        let config = SequenceConfig {
            input_scaling: -0.5,
            ..small_config()
        };
        let result = SequenceModel::new(config).fit(&x, &y);
        assert!(matches!(result, Err(ForecastError::ModelError(_))));
    }

    #[test]
    fn test_zero_input_scaling_still_fits() {
        let (x, y) = sine_rows(60);
        let config = SequenceConfig {
            input_scaling: 0.0,
            ..small_config()
        };
        assert!(SequenceModel::new(config).fit(&x, &y).is_ok());
    }

    #[test]
    fn test_too_few_rows() {
        let (x, y) = sine_rows(6);
        assert!(SequenceModel::new(small_config()).fit(&x, &y).is_err());
    }
}
