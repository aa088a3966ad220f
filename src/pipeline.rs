//! End-to-end aggregation for one sensor series
//!
//! validate window -> clip readings -> select width -> bucket -> shape records

use crate::aggregate::{ChartKind, Downsampler, select_interval};
use crate::config::EngineConfig;
use crate::data::{DataPoint, Reading, TimeWindow};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use log::debug;

/// What the dashboard asked for
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRequest {
    pub window: TimeWindow,
    /// Seconds between nominal native readings of this sensor
    pub native_period_secs: f64,
    pub kind: ChartKind,
    /// Label copied onto every output record
    pub equipment: Option<String>,
}

/// Result of one aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Window after validation (end may have been clamped)
    pub window: TimeWindow,
    pub width_secs: f64,
    pub points: Vec<DataPoint>,
}

impl Aggregation {
    /// True when native resolution was kept
    pub fn is_native(&self, native_period_secs: f64) -> bool {
        self.width_secs == native_period_secs
    }
}

/// Aggregate against the system clock
pub fn aggregate(
    request: &AggregationRequest,
    readings: &[Reading],
    config: &EngineConfig,
) -> Result<Aggregation> {
    aggregate_at(request, readings, config, Utc::now())
}

/// Aggregate with an explicit "now" for window validation
pub fn aggregate_at(
    request: &AggregationRequest,
    readings: &[Reading],
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<Aggregation> {
    profiling::scope!("aggregate");

    let window = config.validator().validate_at(request.window, now)?;

    let clipped = window.clip(readings);
    if clipped.is_empty() {
        return Err(EngineError::EmptySeries);
    }

    let width_secs = select_interval(request.kind, request.native_period_secs, &window)?;
    let downsampler = if width_secs == request.native_period_secs {
        Downsampler::passthrough(width_secs)?
    } else {
        Downsampler::new(width_secs)?.with_decimals(Some(config.decimals))
    };

    let buckets = downsampler.run_readings(&window, clipped)?;
    debug!(
        "{} readings in window -> {} {} points at {} s",
        clipped.len(),
        buckets.len(),
        request.kind,
        width_secs
    );

    let equipment = request.equipment.as_deref();
    let points = buckets
        .iter()
        .map(|b| DataPoint::from_bucket(b, equipment))
        .collect();

    Ok(Aggregation {
        window,
        width_secs,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WindowError;
    use crate::gaps::GapSynthesizer;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn minute_series(n: i64) -> Vec<Reading> {
        let t0 = start().timestamp_millis();
        (0..n)
            .map(|i| Reading::new(t0 + i * 60_000, 18.0 + (i % 17) as f64 * 0.25))
            .collect()
    }

    fn request(secs: i64) -> AggregationRequest {
        AggregationRequest {
            window: TimeWindow::new(start(), start() + Duration::seconds(secs)),
            native_period_secs: 60.0,
            kind: ChartKind::Timeseries,
            equipment: None,
        }
    }

    #[test]
    fn test_week_of_minute_data() {
        let readings = minute_series(7 * 24 * 60);
        let result =
            aggregate_at(&request(7 * 86_400), &readings, &EngineConfig::default(), now()).unwrap();

        assert_eq!(result.width_secs, 1_800.0);
        assert_eq!(result.points.len(), 336);
        assert_eq!(result.points[0].time, "2024-03-01T00:00:00.000Z");
        assert_eq!(result.points[1].time, "2024-03-01T00:30:00.000Z");
        assert!(result.points.iter().all(|p| p.value.is_some()));
    }

    #[test]
    fn test_hour_of_minute_data_is_unchanged() {
        let readings = minute_series(60);
        let result =
            aggregate_at(&request(3_600), &readings, &EngineConfig::default(), now()).unwrap();

        assert!(result.is_native(60.0));
        assert_eq!(result.points.len(), 60);
        for (point, reading) in result.points.iter().zip(&readings) {
            assert_eq!(point.value, reading.value);
        }
    }

    #[test]
    fn test_synthetic_gaps_surface_as_nulls() {
        let readings = minute_series(100);
        let (pruned, gaps) = GapSynthesizer::seeded(11).synthesize(&readings).unwrap();

        let result =
            aggregate_at(&request(100 * 60), &pruned, &EngineConfig::default(), now()).unwrap();
        assert_eq!(result.points.len(), 100);

        for (i, point) in result.points.iter().enumerate() {
            let in_gap = gaps.iter().any(|g| (g.start_index..g.end_index()).contains(&i));
            if in_gap {
                assert_eq!(point.value, None, "slot {i}");
            } else {
                assert_eq!(point.value, readings[i].value, "slot {i}");
            }
        }
    }

    #[test]
    fn test_equipment_label_and_clamped_end() {
        let readings = minute_series(120);
        let mut req = request(7_200);
        req.equipment = Some("Boiler 1".to_string());
        let early_now = start() + Duration::seconds(3_600);

        let result = aggregate_at(&req, &readings, &EngineConfig::default(), early_now).unwrap();
        assert_eq!(result.window.end, early_now);
        assert_eq!(result.points.len(), 60);
        assert!(result.points.iter().all(|p| p.equipment.as_deref() == Some("Boiler 1")));
    }

    #[test]
    fn test_no_readings_in_window() {
        let readings = minute_series(10);
        let mut req = request(3_600);
        req.window = TimeWindow::new(start() + Duration::days(1), start() + Duration::days(2));

        assert!(matches!(
            aggregate_at(&req, &readings, &EngineConfig::default(), now()),
            Err(EngineError::EmptySeries)
        ));
    }

    #[test]
    fn test_window_errors_come_first() {
        let mut req = request(3_600);
        req.window = TimeWindow::new(
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            start(),
        );
        assert!(matches!(
            aggregate_at(&req, &[], &EngineConfig::default(), now()),
            Err(EngineError::InvalidWindow(WindowError::TooEarly))
        ));
    }

    #[test]
    fn test_bad_period() {
        let readings = minute_series(60);
        let mut req = request(3_600);
        req.native_period_secs = -1.0;
        assert!(matches!(
            aggregate_at(&req, &readings, &EngineConfig::default(), now()),
            Err(EngineError::InvalidSamplingPeriod(_))
        ));
    }

    #[test]
    fn test_huge_period_is_rejected_not_overflowed() {
        let readings = minute_series(60);
        let mut req = request(3_600);
        req.native_period_secs = 1e300;
        assert!(matches!(
            aggregate_at(&req, &readings, &EngineConfig::default(), now()),
            Err(EngineError::InvalidSamplingPeriod(_))
        ));

        req.native_period_secs = 1e15;
        let result = aggregate_at(&req, &readings, &EngineConfig::default(), now()).unwrap();
        assert_eq!(result.points.len(), 1);
        assert_eq!(result.points[0].time, "2024-03-01T00:00:00.000Z");
    }
}
