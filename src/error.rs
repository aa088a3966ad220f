//! Error types for sensor-oxide
//!
//! Every precondition the engine checks surfaces as a typed variant here.
//! Callers map these to user-facing responses; nothing is retried internally.

use thiserror::Error;

/// Why a requested time window was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowError {
    /// Window starts before the configured floor instant
    #[error("window starts before the earliest accepted date")]
    TooEarly,

    /// Window end is not after its start
    #[error("window end must be after window start")]
    Inverted,

    /// Window end lies beyond the current time
    #[error("window ends in the future")]
    InFuture,
}

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Rejected time window
    #[error("Invalid window: {0}")]
    InvalidWindow(#[from] WindowError),

    /// Native sampling period is not a positive finite number of seconds
    #[error("Invalid sampling period: {0} s")]
    InvalidSamplingPeriod(f64),

    /// Bucket width is not a positive finite number of seconds
    #[error("Invalid bucket width: {0} s")]
    InvalidWidth(f64),

    /// No raw readings fall inside the requested window
    #[error("No readings available in the requested window")]
    EmptySeries,

    /// Gap synthesizer could not place a non-overlapping run
    #[error("Could not place gap {gap} without overlap after {attempts} attempts")]
    GapPlacementExhausted { gap: usize, attempts: usize },

    /// Timestamp and value arrays differ in length
    #[error("Series length mismatch: {timestamps} timestamps, {values} values")]
    MismatchedSeries { timestamps: usize, values: usize },

    /// Timestamps are not ascending
    #[error("Series is not sorted by timestamp at index {index}")]
    UnsortedSeries { index: usize },

    /// File I/O error
    #[error("Failed to access file: {0}")]
    FileIo(#[from] std::io::Error),

    /// Polars data processing error
    #[error("Data processing error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Unsupported file format
    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    /// Column not found in data
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Get a user-friendly error message suitable for an API or CLI response
    pub fn user_message(&self) -> String {
        match self {
            EngineError::InvalidWindow(WindowError::TooEarly) => {
                "The start date is earlier than the first available data".to_string()
            }
            EngineError::InvalidWindow(WindowError::Inverted) => {
                "The start date must be earlier than the end date".to_string()
            }
            EngineError::InvalidWindow(WindowError::InFuture) => {
                "The requested window lies in the future".to_string()
            }
            EngineError::InvalidSamplingPeriod(p) => {
                format!("Sampling period must be positive, got {}", p)
            }
            EngineError::InvalidWidth(w) => format!("Bucket width must be positive, got {}", w),
            EngineError::EmptySeries => "Not enough data".to_string(),
            EngineError::GapPlacementExhausted { gap, attempts } => {
                format!("Gap {} could not be placed after {} attempts", gap, attempts)
            }
            EngineError::MismatchedSeries { timestamps, values } => {
                format!("{} timestamps but {} values", timestamps, values)
            }
            EngineError::UnsortedSeries { index } => {
                format!("Readings out of order at position {}", index)
            }
            EngineError::FileIo(e) => format!("File error: {}", e),
            EngineError::Polars(e) => format!("Data error: {}", e),
            EngineError::UnsupportedFormat { extension } => {
                format!("Unsupported file format: '.{}'", extension)
            }
            EngineError::ColumnNotFound { column } => format!("Column '{}' not found", column),
            EngineError::Config(msg) => format!("Config error: {}", msg),
            EngineError::Json(e) => format!("JSON error: {}", e),
        }
    }

    /// Get a short title for the error
    pub fn title(&self) -> &'static str {
        match self {
            EngineError::InvalidWindow(_) => "Invalid Window",
            EngineError::InvalidSamplingPeriod(_) => "Invalid Sampling Period",
            EngineError::InvalidWidth(_) => "Invalid Width",
            EngineError::EmptySeries => "Insufficient Data",
            EngineError::GapPlacementExhausted { .. } => "Gap Placement Exhausted",
            EngineError::MismatchedSeries { .. } => "Mismatched Series",
            EngineError::UnsortedSeries { .. } => "Unsorted Series",
            EngineError::FileIo(_) => "File Error",
            EngineError::Polars(_) => "Data Error",
            EngineError::UnsupportedFormat { .. } => "Unsupported Format",
            EngineError::ColumnNotFound { .. } => "Column Not Found",
            EngineError::Config(_) => "Configuration Error",
            EngineError::Json(_) => "JSON Error",
        }
    }

    /// Whether the caller supplied bad input, as opposed to missing data or I/O trouble
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidWindow(_)
                | EngineError::InvalidSamplingPeriod(_)
                | EngineError::InvalidWidth(_)
                | EngineError::MismatchedSeries { .. }
                | EngineError::UnsortedSeries { .. }
        )
    }
}
