//! Commodity configuration, weather attributes and synthetic weather/price data

use crate::data::{Frame, DEFAULT_TARGET_COLUMN};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use weather_math::{drought_index, DegreeDayBases};

/// Kind of commodity being priced; decides which weather attributes drive the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommodityType {
    /// Crops: growth, rainfall and drought matter
    Agricultural,
    /// Power and gas: heating and cooling demand, wind and solar supply matter
    Energy,
}

impl CommodityType {
    /// Weather attributes that get lag and rolling features
    pub fn primary_attributes(&self) -> &'static [WeatherAttribute] {
        use WeatherAttribute::*;
        match self {
            CommodityType::Agricultural => &[
                Temperature,
                Precipitation,
                Humidity,
                SolarRadiation,
                GrowingDegreeDays,
                DroughtIndex,
            ],
            CommodityType::Energy => &[
                Temperature,
                Humidity,
                WindSpeed,
                SolarRadiation,
                HeatingDegreeDays,
                CoolingDegreeDays,
            ],
        }
    }
}

impl fmt::Display for CommodityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommodityType::Agricultural => write!(f, "agricultural"),
            CommodityType::Energy => write!(f, "energy"),
        }
    }
}

impl FromStr for CommodityType {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "agricultural" | "agriculture" => Ok(CommodityType::Agricultural),
            "energy" => Ok(CommodityType::Energy),
            other => Err(ForecastError::ValidationError(format!(
                "Unknown commodity type: {}",
                other
            ))),
        }
    }
}

/// A daily weather column, raw or derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherAttribute {
    Temperature,
    Precipitation,
    Humidity,
    WindSpeed,
    SolarRadiation,
    GrowingDegreeDays,
    HeatingDegreeDays,
    CoolingDegreeDays,
    FrostFlag,
    DroughtIndex,
}

impl WeatherAttribute {
    /// Attributes measured directly
    pub const RAW: [WeatherAttribute; 5] = [
        WeatherAttribute::Temperature,
        WeatherAttribute::Precipitation,
        WeatherAttribute::Humidity,
        WeatherAttribute::WindSpeed,
        WeatherAttribute::SolarRadiation,
    ];

    /// Attributes computed from the raw ones
    pub const DERIVED: [WeatherAttribute; 5] = [
        WeatherAttribute::GrowingDegreeDays,
        WeatherAttribute::HeatingDegreeDays,
        WeatherAttribute::CoolingDegreeDays,
        WeatherAttribute::FrostFlag,
        WeatherAttribute::DroughtIndex,
    ];

    /// Column name in frames
    pub fn column_name(&self) -> &'static str {
        match self {
            WeatherAttribute::Temperature => "temperature",
            WeatherAttribute::Precipitation => "precipitation",
            WeatherAttribute::Humidity => "humidity",
            WeatherAttribute::WindSpeed => "wind_speed",
            WeatherAttribute::SolarRadiation => "solar_radiation",
            WeatherAttribute::GrowingDegreeDays => "growing_degree_days",
            WeatherAttribute::HeatingDegreeDays => "heating_degree_days",
            WeatherAttribute::CoolingDegreeDays => "cooling_degree_days",
            WeatherAttribute::FrostFlag => "frost_flag",
            WeatherAttribute::DroughtIndex => "drought_index",
        }
    }
}

/// One day of raw weather
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawWeather {
    pub temperature: f64,
    pub precipitation: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub solar_radiation: f64,
}

impl RawWeather {
    fn value(&self, attribute: WeatherAttribute) -> Option<f64> {
        match attribute {
            WeatherAttribute::Temperature => Some(self.temperature),
            WeatherAttribute::Precipitation => Some(self.precipitation),
            WeatherAttribute::Humidity => Some(self.humidity),
            WeatherAttribute::WindSpeed => Some(self.wind_speed),
            WeatherAttribute::SolarRadiation => Some(self.solar_radiation),
            _ => None,
        }
    }
}

/// Build a frame holding the raw weather columns for the given days
pub fn raw_weather_frame(dates: Vec<NaiveDate>, weather: &[RawWeather]) -> Result<Frame> {
    if dates.len() != weather.len() {
        return Err(ForecastError::DataError(format!(
            "{} dates but {} weather rows",
            dates.len(),
            weather.len()
        )));
    }

    let mut frame = Frame::new(dates);
    for attribute in WeatherAttribute::RAW {
        let values = weather.iter().map(|w| w.value(attribute)).collect();
        frame.insert_column(attribute.column_name(), values)?;
    }
    Ok(frame)
}

/// Compute the derived weather columns from temperature and precipitation.
///
/// Degree-days and the frost flag are per-day functions of temperature; the
/// drought index looks back over the whole precipitation column, so the
/// frame must be in date order.
pub fn with_derived_weather(
    frame: &Frame,
    bases: &DegreeDayBases,
    drought_window: usize,
) -> Result<Frame> {
    let temperature = frame.column_values(WeatherAttribute::Temperature.column_name())?;
    let precipitation = frame.column_values(WeatherAttribute::Precipitation.column_name())?;

    let per_day = |f: &dyn Fn(f64) -> f64| -> Vec<f64> { temperature.iter().map(|&t| f(t)).collect() };

    let mut derived = frame.clone();
    derived.insert_values(
        WeatherAttribute::GrowingDegreeDays.column_name(),
        per_day(&|t| bases.growing_degree_days(t)),
    )?;
    derived.insert_values(
        WeatherAttribute::HeatingDegreeDays.column_name(),
        per_day(&|t| bases.heating_degree_days(t)),
    )?;
    derived.insert_values(
        WeatherAttribute::CoolingDegreeDays.column_name(),
        per_day(&|t| bases.cooling_degree_days(t)),
    )?;
    derived.insert_values(
        WeatherAttribute::FrostFlag.column_name(),
        per_day(&|t| bases.frost_flag(t)),
    )?;
    derived.insert_values(
        WeatherAttribute::DroughtIndex.column_name(),
        drought_index(&precipitation, drought_window)?,
    )?;

    Ok(derived)
}

/// Seasonal climate used to synthesize daily weather.
///
/// Temperature, solar radiation and wind follow an annual cycle peaking in
/// late June; rain falls on random wet days with exponential amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct Climatology {
    pub mean_temperature: f64,
    pub temperature_amplitude: f64,
    pub temperature_noise: f64,
    pub wet_day_probability: f64,
    pub mean_wet_day_precipitation: f64,
    pub mean_humidity: f64,
    pub mean_wind_speed: f64,
    pub mean_solar_radiation: f64,
    pub solar_amplitude: f64,
}

impl Default for Climatology {
    fn default() -> Self {
        Self {
            mean_temperature: 12.0,
            temperature_amplitude: 12.0,
            temperature_noise: 3.0,
            wet_day_probability: 0.35,
            mean_wet_day_precipitation: 6.0,
            mean_humidity: 65.0,
            mean_wind_speed: 4.5,
            mean_solar_radiation: 180.0,
            solar_amplitude: 110.0,
        }
    }
}

impl Climatology {
    /// Draw one day of weather
    pub fn sample<R: Rng + ?Sized>(&self, date: NaiveDate, rng: &mut R) -> Result<RawWeather> {
        let doy = date.ordinal() as f64;
        let season = (2.0 * PI * (doy - 80.0) / 365.25).sin();
        let winter = (2.0 * PI * doy / 365.25).cos();

        let temperature =
            self.mean_temperature + self.temperature_amplitude * season + gaussian(rng, self.temperature_noise)?;

        let wet_probability = (self.wet_day_probability + 0.1 * winter).clamp(0.0, 1.0);
        let precipitation = if rng.gen::<f64>() < wet_probability {
            let amount = Exp::new(1.0 / self.mean_wet_day_precipitation)
                .map_err(|e| ForecastError::ValidationError(format!("precipitation: {}", e)))?;
            amount.sample(rng)
        } else {
            0.0
        };

        let humidity = (self.mean_humidity + 10.0 * winter + 0.8 * precipitation + gaussian(rng, 5.0)?)
            .clamp(15.0, 100.0);
        let wind_speed = (self.mean_wind_speed - 1.5 * season + gaussian(rng, 1.5)?).max(0.0);
        let solar_radiation = (self.mean_solar_radiation + self.solar_amplitude * season
            - 4.0 * precipitation
            + gaussian(rng, 20.0)?)
        .max(0.0);

        Ok(RawWeather {
            temperature,
            precipitation,
            humidity,
            wind_speed,
            solar_radiation,
        })
    }
}

fn gaussian<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> Result<f64> {
    let normal = Normal::new(0.0, std_dev)
        .map_err(|e| ForecastError::ValidationError(format!("noise: {}", e)))?;
    Ok(normal.sample(rng))
}

/// Consecutive days starting at `start`
pub fn daily_dates(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    (0..n).map(|i| start + Duration::days(i as i64)).collect()
}

/// Generator of synthetic daily weather with a weather-driven commodity price
#[derive(Debug, Clone)]
pub struct SyntheticWeatherGenerator {
    commodity: CommodityType,
    seed: u64,
    climatology: Climatology,
    bases: DegreeDayBases,
    drought_window: usize,
    target_column: String,
}

impl SyntheticWeatherGenerator {
    /// Create a generator for the given commodity with seed 42
    pub fn new(commodity: CommodityType) -> Self {
        Self {
            commodity,
            seed: 42,
            climatology: Climatology::default(),
            bases: DegreeDayBases::default(),
            drought_window: weather_math::DEFAULT_DROUGHT_WINDOW,
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_bases(mut self, bases: DegreeDayBases) -> Self {
        self.bases = bases;
        self
    }

    pub fn with_drought_window(mut self, window: usize) -> Self {
        self.drought_window = window;
        self
    }

    pub fn with_target_column(mut self, name: &str) -> Self {
        self.target_column = name.to_string();
        self
    }

    /// Generate `n_samples` consecutive days starting at `start`.
    ///
    /// The frame holds the raw and derived weather columns plus the price
    /// column. Prices combine a slow trend, an annual cycle, the commodity's
    /// weather response and a persistent AR(1) shock, floored at zero.
    pub fn generate(&self, n_samples: usize, start: NaiveDate) -> Result<Frame> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let dates = daily_dates(start, n_samples);

        let weather = dates
            .iter()
            .map(|&d| self.climatology.sample(d, &mut rng))
            .collect::<Result<Vec<_>>>()?;

        let frame = raw_weather_frame(dates, &weather)?;
        let mut frame = with_derived_weather(&frame, &self.bases, self.drought_window)?;

        let prices = self.prices(&frame, &mut rng)?;
        frame.insert_values(&self.target_column, prices)?;

        info!(
            "Generated {} days of synthetic {} data from {}",
            n_samples, self.commodity, start
        );
        Ok(frame)
    }

    fn prices(&self, frame: &Frame, rng: &mut StdRng) -> Result<Vec<f64>> {
        let column = |a: WeatherAttribute| frame.column_values(a.column_name());
        let humidity = column(WeatherAttribute::Humidity)?;
        let wind = column(WeatherAttribute::WindSpeed)?;
        let solar = column(WeatherAttribute::SolarRadiation)?;
        let gdd = column(WeatherAttribute::GrowingDegreeDays)?;
        let hdd = column(WeatherAttribute::HeatingDegreeDays)?;
        let cdd = column(WeatherAttribute::CoolingDegreeDays)?;
        let frost = column(WeatherAttribute::FrostFlag)?;
        let drought = column(WeatherAttribute::DroughtIndex)?;

        let mut shock = 0.0;
        let mut prices = Vec::with_capacity(frame.len());

        for (i, date) in frame.dates().iter().enumerate() {
            let t = i as f64;
            let cycle = (2.0 * PI * date.ordinal() as f64 / 365.25).sin();

            let price = match self.commodity {
                CommodityType::Agricultural => {
                    shock = 0.85 * shock + gaussian(rng, 3.0)?;
                    200.0 + 0.01 * t + 8.0 * cycle - 1.2 * gdd[i] + 60.0 * drought[i]
                        + 25.0 * frost[i]
                        - 0.4 * (humidity[i] - 65.0)
                        + shock
                }
                CommodityType::Energy => {
                    shock = 0.8 * shock + gaussian(rng, 2.0)?;
                    80.0 + 0.005 * t + 4.0 * cycle + 2.5 * hdd[i] + 3.0 * cdd[i]
                        - 1.2 * wind[i]
                        - 0.03 * solar[i]
                        + shock
                }
            };
            prices.push(price.max(0.0));
        }

        Ok(prices)
    }
}

/// Source of raw weather for days beyond the end of the history
pub trait FutureWeather {
    /// Raw weather columns (see [`WeatherAttribute::RAW`]) for `dates`
    fn weather_for(&self, dates: &[NaiveDate], history: &Frame) -> Result<Frame>;
}

/// Future weather drawn from the synthetic generator's climatology
#[derive(Debug, Clone)]
pub struct ClimatologyWeather {
    climatology: Climatology,
    seed: u64,
}

impl ClimatologyWeather {
    pub fn new(seed: u64) -> Self {
        Self {
            climatology: Climatology::default(),
            seed,
        }
    }

    pub fn with_climatology(mut self, climatology: Climatology) -> Self {
        self.climatology = climatology;
        self
    }
}

impl FutureWeather for ClimatologyWeather {
    fn weather_for(&self, dates: &[NaiveDate], _history: &Frame) -> Result<Frame> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let weather = dates
            .iter()
            .map(|&d| self.climatology.sample(d, &mut rng))
            .collect::<Result<Vec<_>>>()?;
        raw_weather_frame(dates.to_vec(), &weather)
    }
}

/// Externally supplied future weather, e.g. a meteorological forecast
#[derive(Debug, Clone)]
pub struct SuppliedWeather {
    frame: Frame,
}

impl SuppliedWeather {
    pub fn new(frame: Frame) -> Self {
        Self { frame }
    }
}

impl FutureWeather for SuppliedWeather {
    fn weather_for(&self, dates: &[NaiveDate], _history: &Frame) -> Result<Frame> {
        let by_date = self.frame.sort_by_date()?;
        let mask: Vec<bool> = by_date.dates().iter().map(|d| dates.contains(d)).collect();
        let selected = by_date.filter(&mask)?;

        if selected.dates() != dates {
            return Err(ForecastError::DataError(format!(
                "Supplied weather covers {} of the {} forecast days",
                selected.len(),
                dates.len()
            )));
        }

        let names: Vec<&str> = WeatherAttribute::RAW.iter().map(|a| a.column_name()).collect();
        selected.select(&names)
    }
}
