//! Engine-wide constants and default values
//!
//! This module centralizes the ladders, budgets and policy defaults used by the
//! aggregation engine so they are easy to find and tune in one place.

/// Time units understood by the interval ladders
pub mod units {
    pub const SECOND: u32 = 1;
    pub const MINUTE: u32 = 60;
    pub const HOUR: u32 = 3_600;
    pub const DAY: u32 = 86_400;

    pub const MILLIS_PER_SECOND: f64 = 1_000.0;
}

/// Ladder tables and output budgets per chart kind
pub mod ladder {
    /// Maximum visible points for line charts
    pub const TIMESERIES_MAX_POINTS: u32 = 549;

    /// Maximum visible bars for bar charts
    pub const BARCHART_MAX_POINTS: u32 = 10;

    pub const TIMESERIES_SECONDS: &[u32] = &[1, 2, 3, 5, 10, 30];
    pub const TIMESERIES_MINUTES: &[u32] = &[1, 2, 3, 5, 10, 30];
    pub const TIMESERIES_HOURS: &[u32] = &[1, 2, 3, 5, 12, 24, 48];
    pub const TIMESERIES_DAYS: &[u32] = &[1, 2];

    pub const BARCHART_HOURS: &[u32] = &[1, 2, 3, 5, 12, 24, 48];
    pub const BARCHART_DAYS: &[u32] = &[
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20,
    ];
}

/// Downsampling output defaults
pub mod aggregate {
    /// Decimal places kept on averaged bucket values
    pub const DEFAULT_DECIMALS: u32 = 2;
}

/// Date range validation defaults
pub mod window {
    /// Earliest accepted window start (UTC calendar date)
    pub const FLOOR_YEAR: i32 = 2024;
    pub const FLOOR_MONTH: u32 = 1;
    pub const FLOOR_DAY: u32 = 1;
}

/// Synthetic gap generation defaults
pub mod gaps {
    /// Inclusive range for the number of gaps carved per series
    pub const MIN_GAPS: usize = 1;
    pub const MAX_GAPS: usize = 4;

    /// Mean gap length as a fraction of the series length
    pub const MEAN_LENGTH_FRACTION: f64 = 0.01;

    /// Standard deviation as a fraction of the mean gap length
    pub const STD_DEV_FRACTION: f64 = 0.25;

    /// Placement attempts per gap before giving up
    pub const DEFAULT_MAX_ATTEMPTS: usize = 1_000;
}

/// Configuration file paths
pub mod config {
    /// Configuration file name
    pub const CONFIG_FILE: &str = "sensor-oxide.json";
}
