//! Invariants of the drought index over arbitrary precipitation histories.

use proptest::prelude::*;
use weather_math::{drought_index, DEFAULT_DROUGHT_WINDOW};

fn precipitation_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop_oneof![Just(0.0), 0.0..80.0_f64], 0..400)
}

proptest! {
    #[test]
    fn drought_index_is_bounded(precipitation in precipitation_strategy(), window in 1usize..60) {
        let index = drought_index(&precipitation, window).unwrap();

        prop_assert_eq!(index.len(), precipitation.len());
        for value in index {
            prop_assert!(value >= 0.0);
            prop_assert!(value <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn constant_positive_precipitation_is_never_dry(level in 0.01..50.0_f64, len in 1usize..200) {
        let index = drought_index(&vec![level; len], DEFAULT_DROUGHT_WINDOW).unwrap();
        prop_assert!(index.iter().all(|&v| v.abs() < 1e-12));
    }
}
