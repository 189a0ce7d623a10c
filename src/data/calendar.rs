//! Calendar arithmetic on `CalendarDate`
//!
//! Day rollover, month lengths and the daylight saving window are computed here
//! without going through a timezone database. Compact `yymmdd` dates carry only
//! two year digits; the century comes from [`TimeConstants`], so they are only
//! meaningful within that one century.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use super::{CalendarDate, DstStatus};
use crate::config::TimeConstants;

/// Errors raised by calendar arithmetic and date parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    /// Month outside 1-12
    #[error("Invalid month: {0}")]
    InvalidMonth(u32),

    /// Malformed date text or a day that does not exist
    #[error("Invalid date: '{0}'")]
    InvalidDate(String),
}

/// Returns the number of days in `month` of `year` under the Gregorian rules
pub fn days_in_month(month: u32, year: i32) -> Result<u32, CalendarError> {
    let days = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => return Err(CalendarError::InvalidMonth(month)),
    };
    Ok(days)
}

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Checks the strict `yyyy-mm-dd` shape: ten characters, hyphens at positions
/// 4 and 7, digits everywhere else. Does not check that the day exists.
pub fn is_valid_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Parses an expanded `yyyy-mm-dd` date
pub fn parse_expanded(text: &str) -> Result<CalendarDate, CalendarError> {
    if !is_valid_date(text) {
        return Err(CalendarError::InvalidDate(text.to_string()));
    }
    let invalid = || CalendarError::InvalidDate(text.to_string());
    let year = text[0..4].parse::<i32>().map_err(|_| invalid())?;
    let month = text[5..7].parse::<u32>().map_err(|_| invalid())?;
    let day = text[8..10].parse::<u32>().map_err(|_| invalid())?;
    CalendarDate::new(year, month, day).map_err(|_| invalid())
}

/// Lists every date from `start` to `end` inclusive; empty if `end` precedes `start`
pub fn date_span(start: CalendarDate, end: CalendarDate) -> Vec<CalendarDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        // Only fails past the last representable day, which is never before `end`
        match roll_forward(current) {
            Ok(next) => current = next,
            Err(_) => break,
        }
    }
    dates
}

fn roll_forward(date: CalendarDate) -> Result<CalendarDate, CalendarError> {
    let (mut year, mut month, mut day) = (date.year(), date.month(), date.day() + 1);
    if day > days_in_month(month, year)? {
        day = 1;
        month += 1;
    }
    if month > 12 {
        month = 1;
        year += 1;
    }
    CalendarDate::new(year, month, day)
}

fn roll_backward(date: CalendarDate) -> Result<CalendarDate, CalendarError> {
    let (mut year, mut month, mut day) = (date.year(), date.month(), date.day());
    if day > 1 {
        day -= 1;
    } else {
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
        day = days_in_month(month, year)?;
    }
    CalendarDate::new(year, month, day)
}

/// Calendar operations bound to a fixed set of time constants
#[derive(Debug, Clone, Copy, Default)]
pub struct Calendar {
    constants: TimeConstants,
}

impl Calendar {
    pub fn new(constants: TimeConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &TimeConstants {
        &self.constants
    }

    /// Returns the number of days in `month` of `year`
    pub fn days_in_month(&self, month: u32, year: i32) -> Result<u32, CalendarError> {
        days_in_month(month, year)
    }

    /// Returns the following calendar day
    ///
    /// Fails with `InvalidDate` on the last day of year 9999.
    pub fn roll_forward(&self, date: CalendarDate) -> Result<CalendarDate, CalendarError> {
        roll_forward(date)
    }

    /// Returns the preceding calendar day
    ///
    /// Fails with `InvalidDate` on the first day of year 1000.
    pub fn roll_backward(&self, date: CalendarDate) -> Result<CalendarDate, CalendarError> {
        roll_backward(date)
    }

    /// Classifies a date against the US daylight saving window
    ///
    /// DST begins on the second Sunday of March and ends on the first Sunday of
    /// November; both transition days are reported separately because the offset
    /// changes at 02:00 on them.
    pub fn dst_status(&self, date: CalendarDate) -> Result<DstStatus, CalendarError> {
        let status = match date.month() {
            1 | 2 | 12 => DstStatus::Outside,
            4..=10 => DstStatus::Inside,
            3 => {
                let second_sunday = first_sunday_on_or_after(date.year(), 3, 8)?;
                match date.day() {
                    d if d < second_sunday => DstStatus::Outside,
                    d if d > second_sunday => DstStatus::Inside,
                    _ => DstStatus::Beginning,
                }
            }
            11 => {
                let first_sunday = first_sunday_on_or_after(date.year(), 11, 1)?;
                match date.day() {
                    d if d < first_sunday => DstStatus::Inside,
                    d if d > first_sunday => DstStatus::Outside,
                    _ => DstStatus::End,
                }
            }
            other => return Err(CalendarError::InvalidMonth(other)),
        };
        Ok(status)
    }

    /// Parses a compact `yymmdd` date in the configured century
    pub fn parse_compact(&self, text: &str) -> Result<CalendarDate, CalendarError> {
        let invalid = || CalendarError::InvalidDate(text.to_string());
        if text.len() != 6 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let yy = text[0..2].parse::<i32>().map_err(|_| invalid())?;
        let month = text[2..4].parse::<u32>().map_err(|_| invalid())?;
        let day = text[4..6].parse::<u32>().map_err(|_| invalid())?;
        CalendarDate::new(self.constants.century * 100 + yy, month, day).map_err(|_| invalid())
    }

    /// Parses a date in either the compact or the expanded form
    pub fn parse_any(&self, text: &str) -> Result<CalendarDate, CalendarError> {
        let text = text.trim();
        if text.len() == 6 {
            self.parse_compact(text)
        } else {
            parse_expanded(text)
        }
    }

    /// Formats a date as compact `yymmdd`
    ///
    /// Fails with `InvalidDate` for a date outside the configured century, which
    /// the compact form cannot tell apart from the in-century date.
    pub fn to_compact(&self, date: CalendarDate) -> Result<String, CalendarError> {
        if date.year().div_euclid(100) != self.constants.century {
            return Err(CalendarError::InvalidDate(date.to_string()));
        }
        Ok(format!(
            "{:02}{:02}{:02}",
            date.year().rem_euclid(100),
            date.month(),
            date.day()
        ))
    }

    /// Formats a date as expanded `yyyy-mm-dd`
    pub fn to_expanded(&self, date: CalendarDate) -> String {
        date.to_string()
    }
}

/// Day of month of the first Sunday on or after `year-month-from_day`
fn first_sunday_on_or_after(year: i32, month: u32, from_day: u32) -> Result<u32, CalendarError> {
    let anchor = NaiveDate::from_ymd_opt(year, month, from_day).ok_or_else(|| {
        CalendarError::InvalidDate(format!("{:04}-{:02}-{:02}", year, month, from_day))
    })?;
    let days_to_sunday = 6 - anchor.weekday().num_days_from_monday();
    Ok(from_day + days_to_sunday)
}
