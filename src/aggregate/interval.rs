//! Bucket width selection
//!
//! Picks the smallest "round" width from a chart kind's ladder that keeps the
//! number of output points within the kind's budget.

use super::ladder::ChartKind;
use crate::constants::units::MILLIS_PER_SECOND;
use crate::data::TimeWindow;
use crate::error::{EngineError, Result, WindowError};
use log::{debug, warn};

/// Widths at or above this many milliseconds do not fit an `i64` timestamp offset
const MAX_WIDTH_MILLIS: f64 = i64::MAX as f64;

/// Check that a sampling period is usable
pub fn check_period(native_period_secs: f64) -> Result<()> {
    if native_period_secs.is_finite()
        && native_period_secs > 0.0
        && native_period_secs * MILLIS_PER_SECOND < MAX_WIDTH_MILLIS
    {
        Ok(())
    } else {
        Err(EngineError::InvalidSamplingPeriod(native_period_secs))
    }
}

/// Choose the bucket width, in seconds, for a window at a given native period
///
/// Returns `native_period_secs` unchanged when native resolution already fits
/// the budget. The result is never below the native period.
pub fn select_interval(
    kind: ChartKind,
    native_period_secs: f64,
    window: &TimeWindow,
) -> Result<f64> {
    profiling::scope!("select_interval");

    check_period(native_period_secs)?;
    if window.end <= window.start {
        return Err(WindowError::Inverted.into());
    }

    let ladder = kind.ladder();
    let duration_ms = window.duration_ms() as f64;
    let native_intervals_total = (duration_ms / (native_period_secs * MILLIS_PER_SECOND)).floor();
    let avg_intervals_per_point = native_intervals_total / ladder.max_points as f64;
    let candidate_secs = avg_intervals_per_point * native_period_secs;

    if candidate_secs < native_period_secs {
        debug!(
            "{}: {} native intervals fit the budget of {}, keeping {} s",
            kind, native_intervals_total, ladder.max_points, native_period_secs
        );
        return Ok(native_period_secs);
    }

    let Some(step) = ladder.unit_for(candidate_secs) else {
        return Ok(native_period_secs);
    };

    let num_units = candidate_secs / step.seconds_per_unit as f64;
    let multiple = match step.next_multiple_above(num_units) {
        Some(m) => m,
        None => {
            let largest = step.largest_multiple();
            warn!(
                "{}: {:.2}{} exceeds the ladder, capping at {}{}",
                kind, num_units, step.symbol, largest, step.symbol
            );
            largest
        }
    };

    let width = (multiple as f64 * step.seconds_per_unit as f64).max(native_period_secs);
    debug!(
        "{}: candidate {:.2} s -> {}{} ({} s)",
        kind, candidate_secs, multiple, step.symbol, width
    );
    Ok(width)
}

/// Number of buckets a window splits into at `width_secs`
pub fn bucket_count(window: &TimeWindow, width_secs: f64) -> usize {
    let Some(width_ms) = width_millis(width_secs) else {
        return 0;
    };
    let duration_ms = window.duration_ms();
    if duration_ms <= 0 {
        return 0;
    }
    (duration_ms as u64).div_ceil(width_ms as u64) as usize
}

/// Bucket width in whole milliseconds, `None` unless positive and representable
pub(crate) fn width_millis(width_secs: f64) -> Option<i64> {
    let ms = (width_secs * MILLIS_PER_SECOND).round();
    (ms.is_finite() && ms >= 1.0 && ms < MAX_WIDTH_MILLIS).then_some(ms as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn window_of(secs: i64) -> TimeWindow {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        TimeWindow::new(start, start + Duration::seconds(secs))
    }

    #[test]
    fn test_week_at_one_minute_picks_half_hour() {
        let window = window_of(7 * 86_400);
        let width = select_interval(ChartKind::Timeseries, 60.0, &window).unwrap();
        assert_eq!(width, 1_800.0);
        assert_eq!(bucket_count(&window, width), 336);
        assert!(bucket_count(&window, width) <= 549);
    }

    #[test]
    fn test_hour_at_one_minute_keeps_native() {
        let window = window_of(3_600);
        let width = select_interval(ChartKind::Timeseries, 60.0, &window).unwrap();
        assert_eq!(width, 60.0);
        assert_eq!(bucket_count(&window, width), 60);
    }

    #[test]
    fn test_barchart_month_picks_days() {
        // 30 days at 10 minutes: 4320 intervals / 10 bars = 432 per bar = 3 days
        let window = window_of(30 * 86_400);
        let width = select_interval(ChartKind::Barchart, 600.0, &window).unwrap();
        assert_eq!(width, 4.0 * 86_400.0);
        assert!(bucket_count(&window, width) <= 10);
    }

    #[test]
    fn test_barchart_below_hour_uses_hours() {
        // 1 hour at 60 s: candidate is 360 s, shorter than any barchart unit
        let window = window_of(3_600);
        let width = select_interval(ChartKind::Barchart, 60.0, &window).unwrap();
        assert_eq!(width, 3_600.0);
    }

    #[test]
    fn test_ladder_overflow_falls_back_to_largest() {
        // Five years of minute data want ~3.3 days per point; timeseries days stop at 2
        let window = window_of(5 * 365 * 86_400);
        let width = select_interval(ChartKind::Timeseries, 60.0, &window).unwrap();
        assert_eq!(width, 2.0 * 86_400.0);
    }

    #[test]
    fn test_never_below_native_period() {
        let periods = [0.5, 1.0, 7.0, 60.0, 900.0, 3_600.0, 300_000.0];
        let spans = [60, 3_600, 86_400, 7 * 86_400, 90 * 86_400, 3 * 365 * 86_400];
        for kind in [ChartKind::Timeseries, ChartKind::Barchart] {
            for &period in &periods {
                for &span in &spans {
                    let width = select_interval(kind, period, &window_of(span)).unwrap();
                    assert!(width >= period, "{kind} {period} {span} -> {width}");
                }
            }
        }
    }

    #[test]
    fn test_monotone_in_window_length() {
        for kind in [ChartKind::Timeseries, ChartKind::Barchart] {
            for &period in &[1.0, 10.0, 60.0, 300.0] {
                let mut previous = 0.0;
                for hours in 1..=24 * 60 {
                    let width = select_interval(kind, period, &window_of(hours * 3_600)).unwrap();
                    assert!(width >= previous, "{kind} {period} {hours}h");
                    previous = width;
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let window = window_of(12_345_678);
        let a = select_interval(ChartKind::Timeseries, 13.0, &window).unwrap();
        let b = select_interval(ChartKind::Timeseries, 13.0, &window).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_invalid_inputs() {
        let window = window_of(3_600);
        assert!(matches!(
            select_interval(ChartKind::Timeseries, 0.0, &window),
            Err(EngineError::InvalidSamplingPeriod(_))
        ));
        assert!(matches!(
            select_interval(ChartKind::Timeseries, f64::NAN, &window),
            Err(EngineError::InvalidSamplingPeriod(_))
        ));
        assert!(matches!(
            select_interval(ChartKind::Timeseries, 1e300, &window),
            Err(EngineError::InvalidSamplingPeriod(_))
        ));

        let inverted = TimeWindow::new(window.end, window.start);
        assert!(matches!(
            select_interval(ChartKind::Timeseries, 60.0, &inverted),
            Err(EngineError::InvalidWindow(WindowError::Inverted))
        ));
    }

    #[test]
    fn test_bucket_count_rounds_up() {
        let window = window_of(100);
        assert_eq!(bucket_count(&window, 30.0), 4);
        assert_eq!(bucket_count(&window, 100.0), 1);
        assert_eq!(bucket_count(&window, 0.0), 0);
        assert_eq!(bucket_count(&window, 1e300), 0);
    }

    #[test]
    fn test_huge_period_gives_single_bucket() {
        let window = window_of(7 * 86_400);
        let period = 1e15;
        let width = select_interval(ChartKind::Timeseries, period, &window).unwrap();
        assert_eq!(width, period);
        assert_eq!(bucket_count(&window, width), 1);
    }
}
