//! Interval ladders: the "round" bucket widths each chart kind may use

use crate::constants::ladder::*;
use crate::constants::units::{DAY, HOUR, MINUTE, SECOND};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chart kind requested by the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Timeseries,
    Barchart,
}

impl ChartKind {
    /// The ladder and point budget for this kind
    pub fn ladder(&self) -> &'static IntervalLadder {
        match self {
            ChartKind::Timeseries => &TIMESERIES_LADDER,
            ChartKind::Barchart => &BARCHART_LADDER,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Timeseries => "timeseries",
            ChartKind::Barchart => "barchart",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rung of a ladder: a time unit and the multiples allowed for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderStep {
    /// Unit symbol: `s`, `m`, `h` or `d`
    pub symbol: char,
    pub seconds_per_unit: u32,
    /// Ascending, positive
    pub multiples: &'static [u32],
}

impl LadderStep {
    /// Smallest multiple strictly greater than `num_units`
    pub fn next_multiple_above(&self, num_units: f64) -> Option<u32> {
        self.multiples.iter().copied().find(|&m| num_units < m as f64)
    }

    /// Largest listed multiple
    pub fn largest_multiple(&self) -> u32 {
        self.multiples.last().copied().unwrap_or(1)
    }
}

/// Allowed bucket widths and output budget for one chart kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalLadder {
    /// Ascending by `seconds_per_unit`
    pub steps: &'static [LadderStep],
    pub max_points: u32,
}

impl IntervalLadder {
    /// Largest unit whose length does not exceed `candidate_secs`
    ///
    /// Falls back to the smallest unit when the candidate is shorter than
    /// every unit of the ladder.
    pub fn unit_for(&self, candidate_secs: f64) -> Option<&LadderStep> {
        self.steps
            .iter()
            .rev()
            .find(|step| step.seconds_per_unit as f64 <= candidate_secs)
            .or_else(|| self.steps.first())
    }
}

pub static TIMESERIES_LADDER: IntervalLadder = IntervalLadder {
    steps: &[
        LadderStep {
            symbol: 's',
            seconds_per_unit: SECOND,
            multiples: TIMESERIES_SECONDS,
        },
        LadderStep {
            symbol: 'm',
            seconds_per_unit: MINUTE,
            multiples: TIMESERIES_MINUTES,
        },
        LadderStep {
            symbol: 'h',
            seconds_per_unit: HOUR,
            multiples: TIMESERIES_HOURS,
        },
        LadderStep {
            symbol: 'd',
            seconds_per_unit: DAY,
            multiples: TIMESERIES_DAYS,
        },
    ],
    max_points: TIMESERIES_MAX_POINTS,
};

pub static BARCHART_LADDER: IntervalLadder = IntervalLadder {
    steps: &[
        LadderStep {
            symbol: 'h',
            seconds_per_unit: HOUR,
            multiples: BARCHART_HOURS,
        },
        LadderStep {
            symbol: 'd',
            seconds_per_unit: DAY,
            multiples: BARCHART_DAYS,
        },
    ],
    max_points: BARCHART_MAX_POINTS,
};
