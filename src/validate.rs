//! Date range validation for incoming window requests

use crate::constants::window::{FLOOR_DAY, FLOOR_MONTH, FLOOR_YEAR};
use crate::data::TimeWindow;
use crate::error::{Result, WindowError};
use chrono::{DateTime, TimeZone, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

/// What to do with a window whose end lies beyond the current time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuturePolicy {
    /// Pull the end back to now
    #[default]
    Clamp,
    /// Refuse the window
    Reject,
}

/// Default earliest accepted window start
pub fn default_floor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(FLOOR_YEAR, FLOOR_MONTH, FLOOR_DAY, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Sanity checks for requested windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRangeValidator {
    pub floor: DateTime<Utc>,
    pub future_policy: FuturePolicy,
}

impl Default for DateRangeValidator {
    fn default() -> Self {
        Self {
            floor: default_floor(),
            future_policy: FuturePolicy::default(),
        }
    }
}

impl DateRangeValidator {
    pub fn new(floor: DateTime<Utc>, future_policy: FuturePolicy) -> Self {
        Self {
            floor,
            future_policy,
        }
    }

    /// Validate against the system clock
    pub fn validate(&self, window: TimeWindow) -> Result<TimeWindow> {
        self.validate_at(window, Utc::now())
    }

    /// Validate against an explicit "now"
    ///
    /// Checks run in order: floor, orientation, future end. Returns the window,
    /// with its end clamped to `now` under [`FuturePolicy::Clamp`].
    pub fn validate_at(&self, window: TimeWindow, now: DateTime<Utc>) -> Result<TimeWindow> {
        if window.start < self.floor {
            return Err(WindowError::TooEarly.into());
        }
        if window.end <= window.start {
            return Err(WindowError::Inverted.into());
        }
        if window.end <= now {
            return Ok(window);
        }

        match self.future_policy {
            FuturePolicy::Reject => Err(WindowError::InFuture.into()),
            FuturePolicy::Clamp if now > window.start => {
                warn!("window end {} is in the future, clamping to {}", window.end, now);
                Ok(TimeWindow::new(window.start, now))
            }
            FuturePolicy::Clamp => Err(WindowError::InFuture.into()),
        }
    }
}
