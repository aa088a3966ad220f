//! Adaptive downsampling and gap-aware aggregation for sensor time series
//!
//! Given raw readings over a requested window, pick a round bucket width from a
//! fixed ladder so the output stays within a chart's point budget, then average
//! readings into those buckets while keeping "no data" as an explicit null.
//!
//! ```text
//! DateRangeValidator -> select_interval -> Downsampler -> DataPoint records
//! ```

pub mod aggregate;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod gaps;
pub mod heatmap;
pub mod pipeline;
pub mod validate;

pub use aggregate::{ChartKind, Downsampler, downsample, select_interval};
pub use config::EngineConfig;
pub use data::{Bucket, DataPoint, Reading, ReadingSource, TimeWindow};
pub use error::{EngineError, Result, WindowError};
pub use gaps::{GapDescriptor, GapSynthesizer, restore_gaps, synthesize_gaps};
pub use heatmap::{HeatmapWeek, weekly_heatmap};
pub use pipeline::{Aggregation, AggregationRequest, aggregate, aggregate_at};
pub use validate::{DateRangeValidator, FuturePolicy};
