//! Rolling-window statistics over daily series
//!
//! Contains the streaming [`RollingWindow`] and the batch helpers built on it:
//! - Lagged copies of a series
//! - Trailing rolling mean and sample standard deviation
//! - Expanding (to-date) mean
//!
//! Batch helpers work on `Option<f64>` cells: a window that is not yet full,
//! or that contains a missing value, yields `None`.

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Fixed-size trailing window over a series with possibly missing values
#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<Option<f64>>,
    sum: f64,
    present: usize,
}

impl RollingWindow {
    /// Create a new rolling window with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
            present: 0,
        })
    }

    /// Push the next observation, evicting the oldest once the window is full
    pub fn update(&mut self, value: Option<f64>) {
        self.values.push_back(value);
        if let Some(v) = value {
            self.sum += v;
            self.present += 1;
        }

        if self.values.len() > self.period {
            if let Some(Some(old)) = self.values.pop_front() {
                self.sum -= old;
                self.present -= 1;
            }
        }
    }

    /// True when the window holds `period` observations and none is missing
    pub fn is_complete(&self) -> bool {
        self.values.len() == self.period && self.present == self.period
    }

    /// Mean of the window, `None` until the window is complete
    pub fn mean(&self) -> Option<f64> {
        if !self.is_complete() {
            return None;
        }
        Some(self.sum / self.period as f64)
    }

    /// Sample standard deviation (ddof = 1) of the window
    pub fn std_dev(&self) -> Option<f64> {
        if !self.is_complete() || self.period < 2 {
            return None;
        }

        // Two-pass over the window; the running sum drifts on long series.
        let mean = self.values.iter().flatten().sum::<f64>() / self.period as f64;
        let variance = self
            .values
            .iter()
            .flatten()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (self.period - 1) as f64;

        Some(variance.sqrt())
    }
}

/// Shift a series forward by `periods`, padding the head with `None`
pub fn lag(values: &[Option<f64>], periods: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let pad = periods.min(n);

    let mut shifted = vec![None; pad];
    shifted.extend_from_slice(&values[..n - pad]);
    shifted
}

/// Trailing mean over `period` observations, current observation included
pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Result<Vec<Option<f64>>> {
    let mut window = RollingWindow::new(period)?;

    Ok(values
        .iter()
        .map(|&v| {
            window.update(v);
            window.mean()
        })
        .collect())
}

/// Trailing sample standard deviation over `period` observations
pub fn rolling_std(values: &[Option<f64>], period: usize) -> Result<Vec<Option<f64>>> {
    let mut window = RollingWindow::new(period)?;

    Ok(values
        .iter()
        .map(|&v| {
            window.update(v);
            window.std_dev()
        })
        .collect())
}

/// Mean of every observation up to and including each position
pub fn expanding_mean(values: &[f64]) -> Vec<f64> {
    let mut sum = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            sum += v;
            sum / (i + 1) as f64
        })
        .collect()
}

/// Trailing mean over at most `period` observations (partial windows allowed)
pub fn trailing_mean(values: &[f64], period: usize) -> Result<Vec<f64>> {
    if period == 0 {
        return Err(MathError::InvalidInput(
            "Period must be greater than zero".to_string(),
        ));
    }

    let mut window: VecDeque<f64> = VecDeque::with_capacity(period);
    let mut sum = 0.0;

    Ok(values
        .iter()
        .map(|&v| {
            window.push_back(v);
            sum += v;
            if window.len() > period {
                if let Some(old) = window.pop_front() {
                    sum -= old;
                }
            }
            sum / window.len() as f64
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_rolling_window_rejects_zero_period() {
        assert!(RollingWindow::new(0).is_err());
    }

    #[test]
    fn test_rolling_mean_needs_full_window() {
        let means = rolling_mean(&some(&[1.0, 2.0, 3.0, 4.0]), 3).unwrap();
        assert_eq!(means[0], None);
        assert_eq!(means[1], None);
        assert!((means[2].unwrap() - 2.0).abs() < 1e-12);
        assert!((means[3].unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_value_poisons_window() {
        let values = vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)];
        let means = rolling_mean(&values, 2).unwrap();
        assert_eq!(means[1], None);
        assert_eq!(means[2], None);
        assert!((means[3].unwrap() - 3.5).abs() < 1e-12);
        assert!((means[4].unwrap() - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_std_is_sample_std() {
        let stds = rolling_std(&some(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 8).unwrap();
        // population std of this classic set is 2.0, sample std is sqrt(32/7)
        assert!((stds[7].unwrap() - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(stds[..7].iter().all(Option::is_none));
    }

    #[test]
    fn test_lag() {
        let lagged = lag(&some(&[1.0, 2.0, 3.0]), 1);
        assert_eq!(lagged, vec![None, Some(1.0), Some(2.0)]);

        let long_lag = lag(&some(&[1.0, 2.0]), 7);
        assert_eq!(long_lag, vec![None, None]);
    }

    #[test]
    fn test_expanding_and_trailing_mean() {
        let values = [2.0, 4.0, 6.0, 8.0];
        assert_eq!(expanding_mean(&values), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(trailing_mean(&values, 2).unwrap(), vec![2.0, 3.0, 5.0, 7.0]);
    }
}
