//! Synthetic sensor dropout for fixtures and demos
//!
//! Not for production paths: output depends on the random source, so it must
//! never feed a result that gets cached under a deterministic key.

use crate::aggregate::check_period;
use crate::constants::gaps::*;
use crate::constants::units::MILLIS_PER_SECOND;
use crate::data::{Reading, format_millis};
use crate::error::{EngineError, Result};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// A contiguous run removed from a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapDescriptor {
    /// Index of the first removed reading in the original series
    pub start_index: usize,
    pub length: usize,
    /// Timestamp of the first removed reading
    pub start_timestamp_ms: i64,
}

impl GapDescriptor {
    /// One past the last removed index
    pub fn end_index(&self) -> usize {
        self.start_index + self.length
    }

    pub fn overlaps(&self, other: &GapDescriptor) -> bool {
        self.start_index < other.end_index() && other.start_index < self.end_index()
    }
}

/// Removes random runs of readings to emulate sensor dropout
pub struct GapSynthesizer<R: Rng> {
    rng: R,
    max_attempts: usize,
}

impl GapSynthesizer<StdRng> {
    /// Reproducible synthesizer
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> GapSynthesizer<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Placement attempts per gap before giving up
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Carve 1 to 4 non-overlapping runs out of `series`
    ///
    /// Returns the remaining readings in their original order and the removed
    /// runs sorted by start index.
    pub fn synthesize(&mut self, series: &[Reading]) -> Result<(Vec<Reading>, Vec<GapDescriptor>)> {
        profiling::scope!("synthesize_gaps");

        if series.is_empty() {
            return Err(EngineError::EmptySeries);
        }

        let len = series.len();
        let gap_count = self.rng.gen_range(MIN_GAPS..=MAX_GAPS);
        let mut removed = vec![false; len];
        let mut gaps = Vec::with_capacity(gap_count);

        for gap in 0..gap_count {
            let run = self.run_length(len);
            let start = self.place(&removed, run).ok_or(EngineError::GapPlacementExhausted {
                gap,
                attempts: self.max_attempts,
            })?;

            removed[start..start + run].iter_mut().for_each(|r| *r = true);
            let descriptor = GapDescriptor {
                start_index: start,
                length: run,
                start_timestamp_ms: series[start].timestamp_ms,
            };
            info!(
                "gap at index {} of length {}, starting at {}",
                descriptor.start_index,
                descriptor.length,
                format_millis(descriptor.start_timestamp_ms)
            );
            gaps.push(descriptor);
        }

        gaps.sort_by_key(|g| g.start_index);
        let pruned = series
            .iter()
            .zip(&removed)
            .filter(|(_, gone)| !**gone)
            .map(|(r, _)| *r)
            .collect();
        Ok((pruned, gaps))
    }

    /// Normal(len/100, 0.25 * mean) clamped to one deviation, at least 1
    fn run_length(&mut self, len: usize) -> usize {
        let mean = len as f64 * MEAN_LENGTH_FRACTION;
        let std_dev = mean * STD_DEV_FRACTION;
        let draw = match Normal::new(mean, std_dev) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => mean,
        };
        let clamped = draw.clamp(mean - std_dev, mean + std_dev);
        (clamped.trunc() as usize).clamp(1, len)
    }

    /// Random start for a run that avoids already removed indices
    fn place(&mut self, removed: &[bool], run: usize) -> Option<usize> {
        let last_start = removed.len() - run;
        (0..self.max_attempts).find_map(|_| {
            let start = self.rng.gen_range(0..=last_start);
            (!removed[start..start + run].iter().any(|&r| r)).then_some(start)
        })
    }
}

/// Synthesize gaps with an entropy-seeded generator
pub fn synthesize_gaps(series: &[Reading]) -> Result<(Vec<Reading>, Vec<GapDescriptor>)> {
    GapSynthesizer::from_entropy().synthesize(series)
}

/// Put null readings back where gaps were carved out
///
/// Placeholder timestamps step from each gap's start by the native period.
pub fn restore_gaps(
    pruned: &[Reading],
    gaps: &[GapDescriptor],
    native_period_secs: f64,
) -> Result<Vec<Reading>> {
    check_period(native_period_secs)?;
    let period_ms = (native_period_secs * MILLIS_PER_SECOND).round() as i64;

    let mut ordered = gaps.to_vec();
    ordered.sort_by_key(|g| g.start_index);

    let total = pruned.len() + ordered.iter().map(|g| g.length).sum::<usize>();
    let mut out = Vec::with_capacity(total);
    let mut source = pruned.iter().copied();

    for gap in &ordered {
        while out.len() < gap.start_index {
            match source.next() {
                Some(r) => out.push(r),
                None => break,
            }
        }
        out.extend(
            (0..gap.length as i64).map(|k| Reading::missing(gap.start_timestamp_ms + k * period_ms)),
        );
    }
    out.extend(source);
    Ok(out)
}
