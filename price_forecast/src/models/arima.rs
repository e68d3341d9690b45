//! ARIMA model of the price series
//!
//! Coefficients are estimated by minimizing the conditional sum of squares
//! of the differenced series with Nelder-Mead. Inside the ensemble the fit
//! only contributes its last in-sample fitted value, repeated for every
//! requested row: it does not see the feature rows and is not a genuine
//! forecast. Use [`ArimaFit::forecast`] for real multi-step forecasts.

use crate::config::ArimaOrder;
use crate::error::{ForecastError, Result};
use crate::models::optimize::{nelder_mead, NelderMeadConfig};
use log::debug;
use std::f64::consts::PI;

/// Coefficient bound keeping the AR part stationary and the MA part invertible
const COEFFICIENT_BOUND: f64 = 0.99;

/// ARIMA(p, d, q) trainer
#[derive(Debug, Clone, Default)]
pub struct ArimaModel {
    order: ArimaOrder,
}

/// Fitted ARIMA(p, d, q)
#[derive(Debug, Clone, PartialEq)]
pub struct ArimaFit {
    order: ArimaOrder,
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    /// Original series
    history: Vec<f64>,
    /// Series after `d` differences
    differenced: Vec<f64>,
    /// In-sample residuals on the differenced scale, 0 before the first fitted step
    residuals: Vec<f64>,
    residual_variance: f64,
    aic: f64,
}

impl ArimaModel {
    pub fn new(order: ArimaOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Shortest series the order can be fitted on
    pub fn min_observations(&self) -> usize {
        self.order.d + self.order.p.max(self.order.q) + 2
    }

    /// Fit on a price series ordered by date
    pub fn fit(&self, series: &[f64]) -> Result<ArimaFit> {
        let ArimaOrder { p, d, q } = self.order;

        if series.len() < self.min_observations() {
            return Err(ForecastError::InsufficientData {
                needed: self.min_observations(),
                got: series.len(),
            });
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(
                "ARIMA series contains non-finite values".to_string(),
            ));
        }

        let differenced = difference(series, d);
        let mean = differenced.iter().sum::<f64>() / differenced.len() as f64;

        let mut initial = vec![mean];
        initial.extend((0..p).map(|i| 0.1 / (i + 1) as f64));
        initial.extend((0..q).map(|i| 0.1 / (i + 1) as f64));

        let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY)];
        bounds.extend(std::iter::repeat((-COEFFICIENT_BOUND, COEFFICIENT_BOUND)).take(p + q));

        let minimum = nelder_mead(
            |params| {
                let (ar, ma) = params[1..].split_at(p);
                conditional_sum_of_squares(&differenced, params[0], ar, ma).0
            },
            &initial,
            &bounds,
            &NelderMeadConfig::default(),
        );

        let intercept = minimum.point[0];
        let (ar, ma) = minimum.point[1..].split_at(p);
        let (css, residuals) = conditional_sum_of_squares(&differenced, intercept, ar, ma);
        if !css.is_finite() {
            return Err(ForecastError::ModelError(
                "ARIMA estimation diverged".to_string(),
            ));
        }

        let effective = (differenced.len() - p.max(q)) as f64;
        let residual_variance = css / effective;
        let log_likelihood = -0.5 * effective * (1.0 + residual_variance.ln() + (2.0 * PI).ln());
        let aic = -2.0 * log_likelihood + 2.0 * (p + q + 1) as f64;

        debug!(
            "ARIMA({},{},{}) fitted in {} iterations, sigma2 = {:.4}",
            p, d, q, minimum.iterations, residual_variance
        );

        Ok(ArimaFit {
            order: self.order,
            intercept,
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            history: series.to_vec(),
            differenced,
            residuals,
            residual_variance,
            aic,
        })
    }
}

/// Apply `d` first differences
fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut current = series.to_vec();
    for _ in 0..d {
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    current
}

/// Sum of squared one-step errors and the residual sequence
fn conditional_sum_of_squares(series: &[f64], intercept: f64, ar: &[f64], ma: &[f64]) -> (f64, Vec<f64>) {
    let start = ar.len().max(ma.len());
    let mut residuals = vec![0.0; series.len()];
    if series.len() <= start {
        return (f64::INFINITY, residuals);
    }

    let mut css = 0.0;
    for t in start..series.len() {
        let prediction = one_step(series, &residuals, t, intercept, ar, ma);
        residuals[t] = series[t] - prediction;
        css += residuals[t] * residuals[t];
    }
    (css, residuals)
}

/// Prediction of `values[t]` from the values and residuals before it
fn one_step(values: &[f64], residuals: &[f64], t: usize, intercept: f64, ar: &[f64], ma: &[f64]) -> f64 {
    let ar_part: f64 = ar
        .iter()
        .enumerate()
        .map(|(i, phi)| phi * (values[t - 1 - i] - intercept))
        .sum();
    let ma_part: f64 = ma
        .iter()
        .enumerate()
        .map(|(i, theta)| theta * residuals[t - 1 - i])
        .sum();
    intercept + ar_part + ma_part
}

impl ArimaFit {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn residual_variance(&self) -> f64 {
        self.residual_variance
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// In-sample one-step fitted values on the original scale.
    ///
    /// Observations before the first fitted step are reported as-is.
    pub fn fitted_values(&self) -> Vec<f64> {
        let offset = self.order.d;
        self.history
            .iter()
            .enumerate()
            .map(|(t, y)| {
                if t < offset {
                    *y
                } else {
                    y - self.residuals[t - offset]
                }
            })
            .collect()
    }

    /// The value the ensemble repeats for every prediction row
    pub fn last_fitted_value(&self) -> f64 {
        let offset = self.order.d;
        let last = self.history.len() - 1;
        self.history[last] - self.residuals[last - offset]
    }

    /// Forecast `horizon` steps past the end of the series
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let n = self.differenced.len();
        let mut values = self.differenced.clone();
        let mut residuals = self.residuals.clone();

        for t in n..n + horizon {
            let next = one_step(&values, &residuals, t, self.intercept, &self.ar, &self.ma);
            values.push(next);
            residuals.push(0.0);
        }

        let mut forecast = values[n..].to_vec();

        // integrate back through each differencing level
        for level in (0..self.order.d).rev() {
            let base = difference(&self.history, level);
            let mut last = base.last().copied().unwrap_or(0.0);
            for value in forecast.iter_mut() {
                last += *value;
                *value = last;
            }
        }

        forecast
    }
}
