//! Gap-aware bucket averaging
//!
//! Tiles a window into fixed-width buckets and averages the raw readings that
//! fall in each one. Buckets with no readings come out as `None`, never as an
//! interpolated or zero value, so charts can draw the gap.

use super::interval::{bucket_count, width_millis};
use crate::constants::aggregate::DEFAULT_DECIMALS;
use crate::data::{Bucket, Reading, TimeWindow, split_readings};
use crate::error::{EngineError, Result, WindowError};
use log::debug;

/// Fixed-width bucket averager
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Downsampler {
    width_secs: f64,
    /// Decimal places kept on bucket means; `None` keeps full precision
    decimals: Option<u32>,
}

impl Downsampler {
    /// Averaging downsampler that rounds means to the default precision
    pub fn new(width_secs: f64) -> Result<Self> {
        if width_millis(width_secs).is_none() {
            return Err(EngineError::InvalidWidth(width_secs));
        }
        Ok(Self {
            width_secs,
            decimals: Some(DEFAULT_DECIMALS),
        })
    }

    /// Downsampler for `width == native period`: raw values are reproduced as-is
    pub fn passthrough(width_secs: f64) -> Result<Self> {
        Ok(Self::new(width_secs)?.with_decimals(None))
    }

    pub fn with_decimals(mut self, decimals: Option<u32>) -> Self {
        self.decimals = decimals;
        self
    }

    /// Bucket readings given as records
    pub fn run_readings(&self, window: &TimeWindow, readings: &[Reading]) -> Result<Vec<Bucket>> {
        let (timestamps, values) = split_readings(readings);
        self.run(window, &timestamps, &values)
    }

    /// Bucket parallel timestamp/value arrays over `window`
    ///
    /// Produces exactly `ceil(duration / width)` buckets stamped with their
    /// start instant. The raw arrays are walked once with a forward cursor.
    pub fn run(
        &self,
        window: &TimeWindow,
        timestamps_ms: &[i64],
        values: &[Option<f64>],
    ) -> Result<Vec<Bucket>> {
        profiling::scope!("downsample");

        if timestamps_ms.len() != values.len() {
            return Err(EngineError::MismatchedSeries {
                timestamps: timestamps_ms.len(),
                values: values.len(),
            });
        }
        if let Some(index) = timestamps_ms.windows(2).position(|w| w[1] < w[0]) {
            return Err(EngineError::UnsortedSeries { index: index + 1 });
        }
        if window.end <= window.start {
            return Err(WindowError::Inverted.into());
        }

        let start_ms = window.start_ms();
        let end_ms = window.end_ms();
        let width_ms =
            width_millis(self.width_secs).ok_or(EngineError::InvalidWidth(self.width_secs))?;

        let mut cursor = timestamps_ms.partition_point(|&t| t < start_ms);
        if cursor == timestamps_ms.len() || !window.contains_ms(timestamps_ms[cursor]) {
            return Err(EngineError::EmptySeries);
        }
        let last_ms = timestamps_ms[timestamps_ms.len() - 1];

        let count = bucket_count(window, self.width_secs);
        let mut buckets = Vec::with_capacity(count);
        let mut empty = 0usize;

        for i in 0..count as i64 {
            let bucket_start = start_ms + i * width_ms;
            let bucket_end = bucket_start.saturating_add(width_ms).min(end_ms);

            // Nothing left, or the next reading is beyond this bucket
            if cursor >= timestamps_ms.len()
                || timestamps_ms[cursor] >= bucket_end
                || last_ms < bucket_start
            {
                buckets.push(Bucket {
                    timestamp_ms: bucket_start,
                    value: None,
                });
                empty += 1;
                continue;
            }

            let mut sum = 0.0;
            let mut n = 0u32;
            while cursor < timestamps_ms.len() && timestamps_ms[cursor] < bucket_end {
                if let Some(v) = values[cursor].filter(|v| !v.is_nan()) {
                    sum += v;
                    n += 1;
                }
                cursor += 1;
            }

            let value = if n > 0 {
                let mean = sum / n as f64;
                Some(match self.decimals {
                    Some(d) => round_to(mean, d),
                    None => mean,
                })
            } else {
                empty += 1;
                None
            };
            buckets.push(Bucket {
                timestamp_ms: bucket_start,
                value,
            });
        }

        debug!(
            "downsampled {} readings into {} buckets of {} s ({} empty)",
            timestamps_ms.len(),
            buckets.len(),
            self.width_secs,
            empty
        );
        Ok(buckets)
    }
}

/// Average raw arrays into `width_secs` buckets, rounding means to 2 decimals
pub fn downsample(
    window: &TimeWindow,
    timestamps_ms: &[i64],
    values: &[Option<f64>],
    width_secs: f64,
) -> Result<Vec<Bucket>> {
    Downsampler::new(width_secs)?.run(window, timestamps_ms, values)
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
