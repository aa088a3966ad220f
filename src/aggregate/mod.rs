//! Adaptive interval selection and bucket aggregation
//!
//! - `ladder`: the allowed round widths and point budgets per chart kind
//! - `interval`: picks a width so output stays within budget
//! - `downsample`: averages raw readings into buckets, keeping gaps as nulls

mod downsample;
mod interval;
mod ladder;

pub use downsample::{Downsampler, downsample, round_to};
pub use interval::{bucket_count, check_period, select_interval};
pub use ladder::{BARCHART_LADDER, ChartKind, IntervalLadder, LadderStep, TIMESERIES_LADDER};
