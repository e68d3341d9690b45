//! Utility functions for the price_forecast crate

use crate::data::Frame;
use chrono::NaiveDate;

/// Number of trailing rows held out for a test ratio
pub fn test_rows(len: usize, test_ratio: f64) -> usize {
    if len == 0 || test_ratio <= 0.0 || test_ratio >= 1.0 {
        return 0;
    }
    ((len as f64 * test_ratio).round() as usize).min(len)
}

/// Split a frame chronologically; the last rows form the test part
pub fn split_frame(frame: &Frame, test_ratio: f64) -> (Frame, Frame) {
    let train_size = frame.len() - test_rows(frame.len(), test_ratio);
    (frame.slice(0, train_size), frame.slice(train_size, frame.len()))
}

/// Consecutive daily dates following `last_date`
pub fn future_dates(last_date: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    last_date.iter_days().skip(1).take(horizon).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_rows_rounds_half_away_from_zero() {
        assert_eq!(test_rows(10, 0.25), 3);
        assert_eq!(test_rows(10, 0.0), 0);
        assert_eq!(test_rows(0, 0.2), 0);
    }

    #[test]
    fn test_split_frame_keeps_order() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = start.iter_days().take(10).collect();
        let values: Vec<Option<f64>> = (0..10).map(|i| Some(f64::from(i))).collect();
        let frame = Frame::new(dates.clone()).with_column("x", values).unwrap();

        let (train, test) = split_frame(&frame, 0.2);
        assert_eq!(train.len(), 8);
        assert_eq!(test.dates(), dates[8..].to_vec());
    }

    #[test]
    fn test_future_dates_are_consecutive() {
        let last = NaiveDate::from_ymd_opt(2020, 12, 30).unwrap();
        let dates = future_dates(last, 3);
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2021, 1, 2).unwrap(),
            ]
        );
        assert!(future_dates(last, 0).is_empty());
    }
}
