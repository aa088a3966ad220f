use crate::data::Reading;
use crate::error::{EngineError, Result};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use std::path::Path;

/// Formats tried, in order, for string timestamp columns
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// ReadingSource wraps a Polars DataFrame of raw sensor rows
///
/// Stands in for the storage layer: load a CSV or Parquet export, narrow it to
/// one sensor with equality filters, then pull out an ascending reading series.
pub struct ReadingSource {
    /// Lazy frame that filters are applied to
    df: LazyFrame,
    /// Materialized DataFrame after the current filters
    materialized: DataFrame,
}

impl ReadingSource {
    /// Load data from a file (CSV or Parquet)
    pub fn load(path: &Path) -> Result<Self> {
        profiling::scope!("ReadingSource::load");

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| EngineError::UnsupportedFormat {
                extension: String::new(),
            })?;

        let df = match extension.to_lowercase().as_str() {
            "parquet" => LazyFrame::scan_parquet(path, Default::default())?,
            "csv" => LazyCsvReader::new(path)
                .with_has_header(true)
                .with_infer_schema_length(Some(100))
                .with_try_parse_dates(true)
                .finish()?,
            ext => {
                return Err(EngineError::UnsupportedFormat {
                    extension: ext.to_string(),
                });
            }
        };

        let materialized = df.clone().collect()?;
        log::debug!(
            "loaded {} rows x {} columns from {}",
            materialized.height(),
            materialized.width(),
            path.display()
        );

        Ok(Self { df, materialized })
    }

    /// Get all column names
    pub fn column_names(&self) -> Vec<String> {
        self.materialized
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Get the number of rows
    pub fn height(&self) -> usize {
        self.materialized.height()
    }

    /// Keep only rows whose integer `column` equals `value`
    pub fn filter_eq(&mut self, column: &str, value: i64) -> Result<()> {
        self.column_values(column)?;
        self.df = self.df.clone().filter(col(column).eq(lit(value)));
        self.materialized = self.df.clone().collect()?;
        Ok(())
    }

    /// Extract an ascending reading series from a time column and a value column
    ///
    /// Rows without a usable timestamp are dropped; null values are kept as
    /// absent readings so they surface as gaps downstream.
    pub fn readings(&self, time_column: &str, value_column: &str) -> Result<Vec<Reading>> {
        profiling::scope!("ReadingSource::readings");

        let times = self.column_as_millis(time_column)?;
        let values = self.column_as_values(value_column)?;

        let mut readings: Vec<Reading> = times
            .into_iter()
            .zip(values)
            .filter_map(|(t, value)| {
                t.map(|timestamp_ms| Reading {
                    timestamp_ms,
                    value,
                })
            })
            .collect();
        readings.sort_by_key(|r| r.timestamp_ms);
        Ok(readings)
    }

    fn column_values(&self, column: &str) -> Result<Series> {
        self.materialized
            .column(column)
            .map(|c| c.as_materialized_series().clone())
            .map_err(|_| {
                log::debug!("'{}' not among columns {:?}", column, self.column_names());
                EngineError::ColumnNotFound {
                    column: column.to_string(),
                }
            })
    }

    /// Column as epoch milliseconds
    /// Datetime/Date columns are converted by unit; integers are taken as milliseconds
    fn column_as_millis(&self, column: &str) -> Result<Vec<Option<i64>>> {
        let series = self.column_values(column)?;

        match series.dtype() {
            DataType::Datetime(unit, _) => {
                let per_ms = match unit {
                    TimeUnit::Nanoseconds => 1_000_000,
                    TimeUnit::Microseconds => 1_000,
                    TimeUnit::Milliseconds => 1,
                };
                let physical = series.cast(&DataType::Int64)?;
                Ok(physical
                    .i64()?
                    .into_iter()
                    .map(|opt| opt.map(|ts| ts.div_euclid(per_ms)))
                    .collect())
            }
            DataType::Date => {
                let physical = series.cast(&DataType::Int32)?;
                Ok(physical
                    .i32()?
                    .into_iter()
                    .map(|opt| opt.map(|days| days as i64 * 86_400_000))
                    .collect())
            }
            DataType::String => Ok(series
                .str()?
                .into_iter()
                .map(|opt| opt.and_then(parse_timestamp_ms))
                .collect()),
            _ => {
                let ints = series.cast(&DataType::Int64)?;
                Ok(ints.i64()?.into_iter().collect())
            }
        }
    }

    /// Column as optional f64 values; unparseable entries become absent
    fn column_as_values(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let series = self.column_values(column)?;

        if let Ok(str_series) = series.str() {
            return Ok(str_series
                .into_iter()
                .map(|opt| opt.and_then(|s| s.trim().parse::<f64>().ok()))
                .collect());
        }

        let floats = series.cast(&DataType::Float64)?;
        Ok(floats.f64()?.into_iter().collect())
    }
}

/// Parse an RFC 3339 or naive (UTC) timestamp string into epoch milliseconds
pub fn parse_timestamp_ms(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}
