//! Core data models for the weather history scraper
//!
//! This module contains the calendar and classification types shared by the
//! timezone arithmetic, the observation matcher and the backfill driver.

pub mod browser;
pub mod calendar;
pub mod matcher;
pub mod observations;
pub mod timezone;

pub use calendar::{date_span, days_in_month, is_valid_date, parse_expanded, Calendar, CalendarError};
pub use matcher::{closest_index, storm_reports, window_around, ObservationWindow, DEFAULT_PADDING};
pub use observations::{
    parse_clock_label, FetchUnavailable, HistoryFetcher, Observation, ObservationFetcher,
    ObservationTable, WundergroundClient,
};
pub use browser::{BrowserClient, DEFAULT_WEBDRIVER_URL};
pub use timezone::{TimezoneError, TimezoneNormalizer};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Earliest year a `CalendarDate` accepts
pub const MIN_YEAR: i32 = 1000;

/// Latest year a `CalendarDate` accepts
pub const MAX_YEAR: i32 = 9999;

/// A real Gregorian calendar date with a four-digit year
///
/// Construction goes through [`CalendarDate::new`], which rejects impossible dates,
/// so every value held by the program names a day that exists. Serializes as the
/// expanded `yyyy-mm-dd` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CalendarDate {
    year: i32,
    month: u32,
    day: u32,
}

impl CalendarDate {
    /// Creates a date, failing if the month or day does not exist
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, CalendarError> {
        let max_day = days_in_month(month, year)?;
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) || day == 0 || day > max_day {
            return Err(CalendarError::InvalidDate(format!(
                "{:04}-{:02}-{:02}",
                year, month, day
            )));
        }
        Ok(Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl From<CalendarDate> for String {
    fn from(date: CalendarDate) -> Self {
        date.to_string()
    }
}

impl TryFrom<String> for CalendarDate {
    type Error = CalendarError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        calendar::parse_expanded(&value)
    }
}

/// Position of a date relative to the daylight saving window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstStatus {
    /// Standard time all day
    Outside,
    /// Daylight time all day
    Inside,
    /// Second Sunday of March: daylight time from 02:00
    Beginning,
    /// First Sunday of November: standard time from 02:00
    End,
}

/// An event's calendar date and time of day after conversion to local time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalInstant {
    pub date: CalendarDate,
    /// Seconds since local midnight, always in `[0, 86400)`
    pub seconds: f64,
}

/// Weather class of the hours surrounding an event
///
/// The numeric codes are the values downstream detector analysis stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConditionClass {
    /// No observation table could be retrieved
    Failure,
    Clear,
    Rain,
    HeavyRain,
    LightningOrHail,
}

impl ConditionClass {
    /// Returns the numeric status code for this class
    pub fn code(self) -> i8 {
        match self {
            ConditionClass::Failure => -1,
            ConditionClass::Clear => 0,
            ConditionClass::Rain => 1,
            ConditionClass::HeavyRain => 2,
            ConditionClass::LightningOrHail => 3,
        }
    }
}
