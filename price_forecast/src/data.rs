//! Date-indexed tables for weather observations, features and forecasts

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use log::debug;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Name of the date column of every frame
pub const DATE_COLUMN: &str = "date";

/// Default name of the price column
pub const DEFAULT_TARGET_COLUMN: &str = "commodity_price";

/// Daily table: a `date` column followed by any number of `Float64` columns.
///
/// Nulls mark missing values (a lag with no history yet, a future price).
/// Row operations run on the underlying polars `DataFrame`; column math
/// reads plain vectors out of it. Every transformation returns a new frame.
#[derive(Debug, Clone)]
pub struct Frame {
    df: DataFrame,
}

impl Frame {
    /// Create a frame with the given dates and no value columns
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            df: Series::new(DATE_COLUMN.into(), dates).into_frame(),
        }
    }

    /// Builder form of [`Frame::insert_column`]
    pub fn with_column(mut self, name: &str, values: Vec<Option<f64>>) -> Result<Self> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    /// Add a column, replacing any existing column with the same name
    pub fn insert_column(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<()> {
        if name == DATE_COLUMN {
            return Err(ForecastError::DataError(format!(
                "'{}' is reserved for the date index",
                DATE_COLUMN
            )));
        }
        if values.len() != self.len() {
            return Err(ForecastError::DataError(format!(
                "Column '{}' has {} values but the frame has {} rows",
                name,
                values.len(),
                self.len()
            )));
        }

        self.df.with_column(Column::new(name.into(), values))?;
        Ok(())
    }

    /// Add a fully populated column
    pub fn insert_values(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        self.insert_column(name, values.into_iter().map(Some).collect())
    }

    /// Get the underlying DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Get the dates
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.df
            .column(DATE_COLUMN)
            .map_err(ForecastError::from)
            .and_then(|column| dates_of(column.as_materialized_series()))
            .unwrap_or_default()
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Check if the frame has no rows
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Get the number of value columns (the date index is not counted)
    pub fn width(&self) -> usize {
        self.df.width().saturating_sub(1)
    }

    /// Value column names in insertion order
    pub fn column_names(&self) -> Vec<&str> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .filter(|name| *name != DATE_COLUMN)
            .collect()
    }

    /// Check whether a value column exists
    pub fn has_column(&self, name: &str) -> bool {
        name != DATE_COLUMN && self.df.get_column_index(name).is_some()
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        if !self.has_column(name) {
            return None;
        }
        let column = self.df.column(name).ok()?;
        Some(column.as_materialized_series().f64().ok()?.into_iter().collect())
    }

    /// Get a column by name, failing if it does not exist
    pub fn require_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        self.column(name).ok_or_else(|| missing_column(name))
    }

    /// Get a column as plain values, failing on any missing cell
    pub fn column_values(&self, name: &str) -> Result<Vec<f64>> {
        self.require_column(name)?
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or_else(|| {
                    ForecastError::DataError(format!(
                        "Column '{}' has a missing value at row {}",
                        name, i
                    ))
                })
            })
            .collect()
    }

    /// Latest date in the frame
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates().into_iter().max()
    }

    /// Last non-missing value of a column
    pub fn last_value(&self, name: &str) -> Option<f64> {
        self.column(name)?.into_iter().rev().find_map(|v| v)
    }

    /// Rows `start..end` (clamped to the frame)
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        let start = start.min(end);

        Self {
            df: self.df.slice(start as i64, end - start),
        }
    }

    /// Keep the rows whose mask entry is true
    pub fn filter(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.len() {
            return Err(ForecastError::DataError(format!(
                "Mask length ({}) doesn't match frame length ({})",
                mask.len(),
                self.len()
            )));
        }

        let mask = BooleanChunked::from_slice("mask".into(), mask);
        Ok(Self {
            df: self.df.filter(&mask)?,
        })
    }

    /// Keep only the named columns, in the given order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut selection: Vec<&str> = Vec::with_capacity(names.len() + 1);
        selection.push(DATE_COLUMN);
        for name in names {
            let name = name.as_ref();
            if !self.has_column(name) {
                return Err(missing_column(name));
            }
            selection.push(name);
        }

        Ok(Self {
            df: self.df.select(selection)?,
        })
    }

    /// Stack `other` below `self`.
    ///
    /// The result has the union of both column sets, `self`'s columns first;
    /// cells a side does not have are null.
    pub fn concat(&self, other: &Frame) -> Result<Self> {
        let mut names: Vec<&str> = self.column_names();
        for name in other.column_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        let top = self.aligned(&names)?;
        let bottom = other.aligned(&names)?;
        Ok(Self {
            df: top.vstack(&bottom)?,
        })
    }

    /// This frame's columns in `names` order, null-padding the ones it lacks
    fn aligned(&self, names: &[&str]) -> Result<DataFrame> {
        let mut df = self.df.select([DATE_COLUMN])?;
        for name in names {
            let column = match self.df.column(name) {
                Ok(column) => column.clone(),
                Err(_) => Column::full_null((*name).into(), self.len(), &DataType::Float64),
            };
            df.with_column(column)?;
        }
        Ok(df)
    }

    /// Rows ordered by date (stable for equal dates)
    pub fn sort_by_date(&self) -> Result<Self> {
        let options = SortMultipleOptions::default().with_maintain_order(true);
        Ok(Self {
            df: self.df.sort([DATE_COLUMN], options)?,
        })
    }

    /// Drop every row with a missing value in any column
    pub fn drop_incomplete_rows(&self) -> Result<Self> {
        let mut mask = BooleanChunked::full("complete".into(), true, self.len());
        for column in self.df.get_columns() {
            mask = &mask & &column.as_materialized_series().is_not_null();
        }
        Ok(Self {
            df: self.df.filter(&mask)?,
        })
    }

    /// Carry the last present value of each column forward over gaps
    pub fn forward_fill(&self) -> Result<Self> {
        Ok(Self {
            df: self.df.fill_null(FillNullStrategy::Forward(None))?,
        })
    }

    /// Replace every remaining missing value with `fill`
    pub fn fill_missing(&self, fill: f64) -> Result<Self> {
        let mut filled = self.clone();
        for name in self.column_names() {
            let values = self
                .df
                .column(name)?
                .as_materialized_series()
                .f64()?
                .fill_null_with_values(fill)?;
            filled.df.with_column(values.into_series())?;
        }
        Ok(filled)
    }

    /// Row-major matrix of the named columns, failing on missing cells
    pub fn to_rows<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Vec<f64>>> {
        let columns = names
            .iter()
            .map(|name| self.require_column(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let dates = self.dates();

        (0..self.len())
            .map(|row| {
                columns
                    .iter()
                    .zip(names)
                    .map(|(values, name)| {
                        values[row].ok_or_else(|| {
                            ForecastError::DataError(format!(
                                "Missing value in column '{}' on {}",
                                name.as_ref(),
                                dates[row]
                            ))
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// Copy of the underlying DataFrame, `date` column first
    pub fn to_dataframe(&self) -> DataFrame {
        self.df.clone()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.df.equals_missing(&other.df)
    }
}

fn missing_column(name: &str) -> ForecastError {
    ForecastError::DataError(format!("Column '{}' not found", name))
}

/// Read a `Date` or `Datetime` series as calendar dates
fn dates_of(series: &Series) -> Result<Vec<NaiveDate>> {
    let days = series.cast(&DataType::Date)?.cast(&DataType::Int32)?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| ForecastError::DataError("Invalid epoch".to_string()))?;

    days.i32()?
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            value
                .and_then(|d| epoch.checked_add_signed(Duration::days(d as i64)))
                .ok_or_else(|| ForecastError::DataError(format!("Missing date at row {}", i)))
        })
        .collect()
}

/// Data loader for daily weather/price tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a frame from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Frame> {
        let path = path.as_ref();
        // Surface a missing file as an IO error rather than a polars one.
        File::open(path)?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        Self::from_dataframe(&df)
    }

    /// Write a frame to a CSV file with a header row
    pub fn to_csv<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<()> {
        let mut df = frame.to_dataframe();
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)?;
        Ok(())
    }

    /// Create a frame from an existing DataFrame.
    ///
    /// The time column is detected by name; every other numeric or boolean
    /// column becomes a frame column. Non-numeric columns are skipped.
    pub fn from_dataframe(df: &DataFrame) -> Result<Frame> {
        let time_column = Self::detect_time_column(df)?;
        let dates = Self::column_as_dates(df, &time_column)?;

        let mut frame = Frame::new(dates);
        for column in df.get_columns() {
            let name = column.name().as_str();
            if name == time_column {
                continue;
            }

            let dtype = column.dtype();
            if !(dtype.is_float() || dtype.is_integer() || matches!(dtype, DataType::Boolean)) {
                debug!("Skipping non-numeric column '{}' ({})", name, dtype);
                continue;
            }

            let series = column
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            let values: Vec<Option<f64>> = series.f64()?.into_iter().collect();
            frame.insert_column(name, values)?;
        }

        frame.sort_by_date()
    }

    /// Detect the time column in a DataFrame
    fn detect_time_column(df: &DataFrame) -> Result<String> {
        for column in df.get_columns() {
            let lower_name = column.name().to_lowercase();
            if lower_name.contains("date") || lower_name.contains("time") {
                return Ok(column.name().to_string());
            }
        }

        // If not found, use the first column if it looks like a date/time
        if let Some(first_col) = df.get_columns().first() {
            if first_col.dtype().is_temporal() {
                return Ok(first_col.name().to_string());
            }
        }

        Err(ForecastError::DataError(
            "No date column found in data".to_string(),
        ))
    }

    /// Read the time column as calendar dates
    fn column_as_dates(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
        let series = df.column(name)?.as_materialized_series();

        match series.dtype() {
            DataType::String => series
                .str()?
                .into_iter()
                .enumerate()
                .map(|(i, value)| {
                    let text = value.ok_or_else(|| {
                        ForecastError::DataError(format!("Missing date at row {}", i))
                    })?;
                    parse_date(text)
                })
                .collect(),
            DataType::Date | DataType::Datetime(_, _) => dates_of(series),
            other => Err(ForecastError::DataError(format!(
                "Column '{}' of type {} cannot be read as dates",
                name, other
            ))),
        }
    }
}

/// Parse `YYYY-MM-DD`, also accepting a trailing time part
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let trimmed = text.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| ForecastError::DataError(format!("Invalid date '{}': {}", text, e)))
}
