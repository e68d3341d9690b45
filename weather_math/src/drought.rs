//! Precipitation-deficit drought index

use crate::rolling::{expanding_mean, trailing_mean};
use crate::Result;

/// Default trailing window, in days
pub const DEFAULT_DROUGHT_WINDOW: usize = 30;

/// Relative precipitation deficit of the recent window against the long-run mean.
///
/// For each day `i`:
///
/// ```text
/// max(0, (expanding_mean[i] - trailing_mean[i]) / expanding_mean[i])
/// ```
///
/// where the trailing mean covers the last `window` days (fewer at the start
/// of the series). Days whose expanding mean is zero, or whose ratio is not
/// finite, are clamped to 0. Values therefore lie in `[0, 1]`.
///
/// # Examples
///
/// ```
/// use weather_math::drought_index;
///
/// let dry_spell = [4.0, 4.0, 4.0, 4.0, 0.0, 0.0];
/// let index = drought_index(&dry_spell, 2).unwrap();
/// assert_eq!(index[0], 0.0);
/// assert!(index[5] > 0.99);
/// ```
pub fn drought_index(precipitation: &[f64], window: usize) -> Result<Vec<f64>> {
    let recent = trailing_mean(precipitation, window)?;
    let long_run = expanding_mean(precipitation);

    Ok(long_run
        .iter()
        .zip(recent.iter())
        .map(|(&overall, &trailing)| {
            if overall == 0.0 {
                return 0.0;
            }
            let deficit = (overall - trailing) / overall;
            if deficit.is_finite() {
                deficit.max(0.0)
            } else {
                0.0
            }
        })
        .collect())
}
