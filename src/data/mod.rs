pub mod series;
pub mod source;

// Re-export key types for convenience
pub use series::{Bucket, DataPoint, Reading, TimeWindow, format_millis, split_readings};
pub use source::{ReadingSource, parse_timestamp_ms};
