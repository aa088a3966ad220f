//! Week-by-weekday averages for calendar heatmaps
//!
//! Dates are taken in UTC. Week numbers follow the Monday-first convention
//! where week 1 is the first week with four or more days in the year; days
//! before it are week 0 and trailing days that belong to next year's week 1
//! are week 53.

use crate::data::Reading;
use chrono::{Datelike, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// One heatmap row: the mean value per weekday of a week
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatmapWeek {
    #[serde(rename = "Week")]
    pub week: u32,
    #[serde(rename = "Monday")]
    pub monday: Option<f64>,
    #[serde(rename = "Tuesday")]
    pub tuesday: Option<f64>,
    #[serde(rename = "Wednesday")]
    pub wednesday: Option<f64>,
    #[serde(rename = "Thursday")]
    pub thursday: Option<f64>,
    #[serde(rename = "Friday")]
    pub friday: Option<f64>,
    #[serde(rename = "Saturday")]
    pub saturday: Option<f64>,
    #[serde(rename = "Sunday")]
    pub sunday: Option<f64>,
}

impl HeatmapWeek {
    pub fn day(&self, weekday: Weekday) -> Option<f64> {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    fn set_day(&mut self, weekday: Weekday, value: Option<f64>) {
        let slot = match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = value;
    }
}

/// Week number of a date within `year` (see module docs)
fn week_of_year<D: Datelike>(date: &D, year: i32) -> u32 {
    let iso = date.iso_week();
    match iso.year().cmp(&year) {
        std::cmp::Ordering::Less => 0,
        std::cmp::Ordering::Greater => 53,
        std::cmp::Ordering::Equal => iso.week(),
    }
}

/// Average readings per (week, weekday) for one calendar year
///
/// Readings from other years and readings without a value are skipped.
pub fn weekly_heatmap(readings: &[Reading], year: i32) -> Vec<HeatmapWeek> {
    profiling::scope!("weekly_heatmap");

    let mut sums: BTreeMap<u32, [(f64, u32); 7]> = BTreeMap::new();

    for reading in readings {
        let Some(value) = reading.value.filter(|v| !v.is_nan()) else {
            continue;
        };
        let Some(dt) = Utc.timestamp_millis_opt(reading.timestamp_ms).single() else {
            continue;
        };
        if dt.year() != year {
            continue;
        }

        let days = sums.entry(week_of_year(&dt, year)).or_insert([(0.0, 0); 7]);
        let slot = &mut days[dt.weekday().num_days_from_monday() as usize];
        slot.0 += value;
        slot.1 += 1;
    }

    sums.into_iter()
        .map(|(week, days)| {
            let mut row = HeatmapWeek {
                week,
                ..Default::default()
            };
            for (weekday, (sum, count)) in WEEKDAYS.iter().zip(days) {
                row.set_day(*weekday, (count > 0).then(|| sum / count as f64));
            }
            row
        })
        .collect()
}
