//! Core value types shared by the aggregation stages

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One raw sensor sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Measured value, `None` when the sensor recorded nothing usable
    pub value: Option<f64>,
}

impl Reading {
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value: Some(value),
        }
    }

    /// A placeholder for a slot with no data
    pub fn missing(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            value: None,
        }
    }
}

/// Split readings into the parallel arrays the downsampler consumes
pub fn split_readings(readings: &[Reading]) -> (Vec<i64>, Vec<Option<f64>>) {
    readings.iter().map(|r| (r.timestamp_ms, r.value)).unzip()
}

/// Requested time range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window without checking it; see [`crate::validate`] for that
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Build a window from epoch milliseconds
    pub fn from_millis(start_ms: i64, end_ms: i64) -> Option<Self> {
        let start = Utc.timestamp_millis_opt(start_ms).single()?;
        let end = Utc.timestamp_millis_opt(end_ms).single()?;
        Some(Self { start, end })
    }

    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }

    /// Signed length in milliseconds (negative for inverted windows)
    pub fn duration_ms(&self) -> i64 {
        self.end_ms() - self.start_ms()
    }

    /// True if `timestamp_ms` lies in the half-open range `[start, end)`
    pub fn contains_ms(&self, timestamp_ms: i64) -> bool {
        timestamp_ms >= self.start_ms() && timestamp_ms < self.end_ms()
    }

    /// Sub-slice of ascending readings that fall inside the window
    pub fn clip<'a>(&self, readings: &'a [Reading]) -> &'a [Reading] {
        let start = readings.partition_point(|r| r.timestamp_ms < self.start_ms());
        let end = readings.partition_point(|r| r.timestamp_ms < self.end_ms());
        &readings[start..end.max(start)]
    }
}

/// Output of one downsampler bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    /// Bucket start in epoch milliseconds
    pub timestamp_ms: i64,
    /// Mean of contributing readings, `None` for an empty bucket
    pub value: Option<f64>,
}

/// Dashboard-facing record, serialized as `{"time": ..., "value": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// ISO-8601 UTC instant
    pub time: String,
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
}

impl DataPoint {
    pub fn from_bucket(bucket: &Bucket, equipment: Option<&str>) -> Self {
        Self {
            time: format_millis(bucket.timestamp_ms),
            value: bucket.value,
            equipment: equipment.map(str::to_string),
        }
    }
}

/// Render epoch milliseconds as an RFC 3339 string with millisecond precision
pub fn format_millis(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => timestamp_ms.to_string(),
    }
}
