//! Degree-day and frost indicators
//!
//! Degree-days measure how far a day's mean temperature sits from a
//! reference threshold:
//! - Growing degree-days (GDD) above the crop base temperature
//! - Heating degree-days (HDD) below the comfort temperature
//! - Cooling degree-days (CDD) above the comfort temperature

use serde::{Deserialize, Serialize};

/// Reference temperatures (°C) for degree-day calculations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegreeDayBases {
    /// Base temperature for crop growth
    pub growing: f64,
    /// Comfort temperature separating heating and cooling demand
    pub comfort: f64,
    /// Temperature below which a day counts as frost
    pub frost: f64,
}

impl Default for DegreeDayBases {
    fn default() -> Self {
        Self {
            growing: 10.0,
            comfort: 18.0,
            frost: 0.0,
        }
    }
}

impl DegreeDayBases {
    /// Growing degree-days for a daily mean temperature
    pub fn growing_degree_days(&self, temperature: f64) -> f64 {
        (temperature - self.growing).max(0.0)
    }

    /// Heating degree-days for a daily mean temperature
    pub fn heating_degree_days(&self, temperature: f64) -> f64 {
        (self.comfort - temperature).max(0.0)
    }

    /// Cooling degree-days for a daily mean temperature
    pub fn cooling_degree_days(&self, temperature: f64) -> f64 {
        (temperature - self.comfort).max(0.0)
    }

    /// 1.0 on frost days, 0.0 otherwise
    pub fn frost_flag(&self, temperature: f64) -> f64 {
        if temperature < self.frost {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_days_at_default_bases() {
        let bases = DegreeDayBases::default();

        assert_eq!(bases.growing_degree_days(25.0), 15.0);
        assert_eq!(bases.growing_degree_days(5.0), 0.0);
        assert_eq!(bases.heating_degree_days(8.0), 10.0);
        assert_eq!(bases.heating_degree_days(20.0), 0.0);
        assert_eq!(bases.cooling_degree_days(20.0), 2.0);
        assert_eq!(bases.cooling_degree_days(18.0), 0.0);
    }

    #[test]
    fn test_heating_and_cooling_are_exclusive() {
        let bases = DegreeDayBases::default();
        for t in [-10.0, 0.0, 17.9, 18.0, 18.1, 35.0] {
            let hdd = bases.heating_degree_days(t);
            let cdd = bases.cooling_degree_days(t);
            assert!(hdd == 0.0 || cdd == 0.0);
        }
    }

    #[test]
    fn test_frost_flag() {
        let bases = DegreeDayBases::default();
        assert_eq!(bases.frost_flag(-0.5), 1.0);
        assert_eq!(bases.frost_flag(0.0), 0.0);
        assert_eq!(bases.frost_flag(12.0), 0.0);
    }
}
