//! Conversion of detector timestamps to local calendar date and time of day
//!
//! Detector events are recorded as a date plus seconds since midnight in a fixed
//! reference offset. Observation tables are published in station local time, so
//! an event has to be shifted by the station's UTC offset (plus one hour while
//! daylight saving is in effect) before it can be matched.

use thiserror::Error;

use super::calendar::{Calendar, CalendarError};
use super::{CalendarDate, DstStatus, LocalInstant};
use crate::config::TimeConstants;

/// Smallest UTC offset accepted, in hours
pub const MIN_OFFSET_HOURS: i32 = -12;

/// Largest UTC offset accepted, in hours
pub const MAX_OFFSET_HOURS: i32 = 14;

/// Errors raised when an event cannot be converted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimezoneError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// Time of day outside `[0, 86400)`
    #[error("Time of day out of range: {0} seconds")]
    TimeOutOfRange(f64),

    /// UTC offset outside the range of real timezones
    #[error("UTC offset out of range: {0} hours")]
    OffsetOutOfRange(i32),
}

/// Shifts event timestamps into local time
#[derive(Debug, Clone, Copy, Default)]
pub struct TimezoneNormalizer {
    calendar: Calendar,
}

impl TimezoneNormalizer {
    pub fn new(constants: TimeConstants) -> Self {
        Self {
            calendar: Calendar::new(constants),
        }
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Returns the offset in effect at a specific instant
    ///
    /// The instant is first projected with the standard offset, rolling the date
    /// when it leaves the day, and the projected date decides whether one hour is
    /// added. On the two transition Sundays the projected time is compared to
    /// 02:00. On the November Sunday the clock still reads daylight time until the
    /// fall back, hence the extra hour before comparing.
    ///
    /// # Arguments
    /// * `date` - Event date in the reference timezone
    /// * `seconds` - Event time of day in the reference timezone
    /// * `base_offset_hours` - Standard (non-DST) offset to local time
    pub fn dst_offset_adjustment(
        &self,
        date: CalendarDate,
        seconds: f64,
        base_offset_hours: i32,
    ) -> Result<i32, TimezoneError> {
        self.check_inputs(seconds, base_offset_hours)?;
        let constants = self.calendar.constants();

        let projected = self.project(date, seconds + base_offset_hours as f64 * constants.sec_per_hour)?;
        let adjusted = match self.calendar.dst_status(projected.date)? {
            DstStatus::Inside => base_offset_hours + 1,
            DstStatus::Outside => base_offset_hours,
            DstStatus::Beginning if projected.seconds >= constants.two_am => base_offset_hours + 1,
            DstStatus::Beginning => base_offset_hours,
            DstStatus::End if projected.seconds + constants.sec_per_hour >= constants.two_am => {
                base_offset_hours
            }
            DstStatus::End => base_offset_hours + 1,
        };
        Ok(adjusted)
    }

    /// Converts an event date and time of day to local date and time of day
    ///
    /// # Arguments
    /// * `date` - Event date in the reference timezone
    /// * `seconds` - Event time of day, must lie in `[0, 86400)`
    /// * `base_offset_hours` - Offset from the reference timezone to local standard time
    /// * `observe_dst` - Whether the station's region observes daylight saving
    ///
    /// # Returns
    /// * `Ok(LocalInstant)` with the time of day normalized into `[0, 86400)`
    /// * `Err(TimezoneError)` if the time or offset is out of range, or the
    ///   local day falls outside years 1000 to 9999
    pub fn to_local(
        &self,
        date: CalendarDate,
        seconds: f64,
        base_offset_hours: i32,
        observe_dst: bool,
    ) -> Result<LocalInstant, TimezoneError> {
        self.check_inputs(seconds, base_offset_hours)?;

        let offset_hours = if observe_dst {
            self.dst_offset_adjustment(date, seconds, base_offset_hours)?
        } else {
            base_offset_hours
        };

        let shifted = seconds + offset_hours as f64 * self.calendar.constants().sec_per_hour;
        self.project(date, shifted)
    }

    /// Normalizes a time of day that left `[0, 86400)` by one day at most
    ///
    /// Fails when the day it lands on is outside the supported years.
    fn project(&self, date: CalendarDate, seconds: f64) -> Result<LocalInstant, TimezoneError> {
        let sec_per_day = self.calendar.constants().sec_per_day;
        let instant = if seconds >= sec_per_day {
            LocalInstant {
                date: self.calendar.roll_forward(date)?,
                seconds: seconds - sec_per_day,
            }
        } else if seconds < 0.0 {
            LocalInstant {
                date: self.calendar.roll_backward(date)?,
                seconds: seconds + sec_per_day,
            }
        } else {
            LocalInstant { date, seconds }
        };
        Ok(instant)
    }

    fn check_inputs(&self, seconds: f64, offset_hours: i32) -> Result<(), TimezoneError> {
        if !(0.0..self.calendar.constants().sec_per_day).contains(&seconds) {
            return Err(TimezoneError::TimeOutOfRange(seconds));
        }
        if !(MIN_OFFSET_HOURS..=MAX_OFFSET_HOURS).contains(&offset_hours) {
            return Err(TimezoneError::OffsetOutOfRange(offset_hours));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: f64 = 3600.0;

    fn date(year: i32, month: u32, day: u32) -> CalendarDate {
        CalendarDate::new(year, month, day).expect("Test date should be valid")
    }

    fn normalizer() -> TimezoneNormalizer {
        TimezoneNormalizer::default()
    }

    #[test]
    fn test_dst_adjustment_outside_and_inside() {
        let tz = normalizer();
        assert_eq!(tz.dst_offset_adjustment(date(2023, 1, 15), 12.0 * HOUR, -7).unwrap(), -7);
        assert_eq!(tz.dst_offset_adjustment(date(2023, 7, 15), 12.0 * HOUR, -7).unwrap(), -6);
    }

    #[test]
    fn test_dst_adjustment_uses_projected_date() {
        let tz = normalizer();
        // 2023-03-13 01:00 at -7 projects to 2023-03-12 18:00, a Beginning day after 02:00
        assert_eq!(tz.dst_offset_adjustment(date(2023, 3, 13), HOUR, -7).unwrap(), -6);
        // 2023-04-01 03:00 at -7 projects back to March 31, inside
        assert_eq!(tz.dst_offset_adjustment(date(2023, 4, 1), 3.0 * HOUR, -7).unwrap(), -6);
        // 2023-03-01 05:00 at -7 projects to February 28, outside
        assert_eq!(tz.dst_offset_adjustment(date(2023, 3, 1), 5.0 * HOUR, -7).unwrap(), -7);
    }

    #[test]
    fn test_dst_adjustment_beginning_day_threshold() {
        let tz = normalizer();
        let sunday = date(2023, 3, 12);
        // Offset 0 keeps the projection on the same clock
        assert_eq!(tz.dst_offset_adjustment(sunday, 1.0 * HOUR, 0).unwrap(), 0);
        assert_eq!(tz.dst_offset_adjustment(sunday, 2.0 * HOUR - 1.0, 0).unwrap(), 0);
        assert_eq!(tz.dst_offset_adjustment(sunday, 2.0 * HOUR, 0).unwrap(), 1);
        assert_eq!(tz.dst_offset_adjustment(sunday, 15.0 * HOUR, 0).unwrap(), 1);
    }

    #[test]
    fn test_dst_adjustment_end_day_threshold() {
        let tz = normalizer();
        let sunday = date(2023, 11, 5);
        // Before 01:00 standard the clock has not fallen back yet
        assert_eq!(tz.dst_offset_adjustment(sunday, 0.5 * HOUR, 0).unwrap(), 1);
        assert_eq!(tz.dst_offset_adjustment(sunday, HOUR - 1.0, 0).unwrap(), 1);
        assert_eq!(tz.dst_offset_adjustment(sunday, HOUR, 0).unwrap(), 0);
        assert_eq!(tz.dst_offset_adjustment(sunday, 20.0 * HOUR, 0).unwrap(), 0);
    }

    #[test]
    fn test_to_local_without_dst() {
        let tz = normalizer();
        let local = tz.to_local(date(2023, 7, 4), 20.0 * HOUR, -5, false).unwrap();
        assert_eq!(local.date, date(2023, 7, 4));
        assert_eq!(local.seconds, 15.0 * HOUR);
    }

    #[test]
    fn test_to_local_with_dst() {
        let tz = normalizer();
        let local = tz.to_local(date(2023, 7, 4), 20.0 * HOUR, -7, true).unwrap();
        assert_eq!(local.date, date(2023, 7, 4));
        assert_eq!(local.seconds, 14.0 * HOUR);
    }

    #[test]
    fn test_to_local_rolls_forward_past_midnight() {
        let tz = normalizer();
        let local = tz.to_local(date(2023, 12, 31), 23.0 * HOUR, 2, false).unwrap();
        assert_eq!(local.date, date(2024, 1, 1));
        assert_eq!(local.seconds, HOUR);
    }

    #[test]
    fn test_to_local_exact_midnight_belongs_to_next_day() {
        let tz = normalizer();
        let local = tz.to_local(date(2023, 2, 28), 22.0 * HOUR, 2, false).unwrap();
        assert_eq!(local.date, date(2023, 3, 1));
        assert_eq!(local.seconds, 0.0);
    }

    #[test]
    fn test_to_local_rolls_backward_using_the_date() {
        let tz = normalizer();
        let local = tz.to_local(date(2024, 3, 1), 2.0 * HOUR, -7, false).unwrap();
        assert_eq!(local.date, date(2024, 2, 29));
        assert_eq!(local.seconds, 19.0 * HOUR);

        let local = tz.to_local(date(2024, 1, 1), 0.0, -1, false).unwrap();
        assert_eq!(local.date, date(2023, 12, 31));
        assert_eq!(local.seconds, 23.0 * HOUR);
    }

    #[test]
    fn test_to_local_result_always_within_day() {
        let tz = normalizer();
        let start = date(2023, 1, 1);
        for offset in MIN_OFFSET_HOURS..=MAX_OFFSET_HOURS {
            for hour in 0..24 {
                let seconds = hour as f64 * HOUR + 1800.0;
                for observe_dst in [false, true] {
                    for d in [start, date(2023, 3, 12), date(2023, 11, 5), date(2023, 12, 31)] {
                        let local = tz.to_local(d, seconds, offset, observe_dst).unwrap();
                        assert!((0.0..86400.0).contains(&local.seconds));
                        let cal = tz.calendar();
                        assert!(
                            local.date == d
                                || local.date == cal.roll_forward(d).unwrap()
                                || local.date == cal.roll_backward(d).unwrap()
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_to_local_rejects_out_of_range_inputs() {
        let tz = normalizer();
        assert_eq!(
            tz.to_local(date(2023, 1, 1), 86400.0, 0, false),
            Err(TimezoneError::TimeOutOfRange(86400.0))
        );
        assert_eq!(
            tz.to_local(date(2023, 1, 1), -1.0, 0, false),
            Err(TimezoneError::TimeOutOfRange(-1.0))
        );
        assert_eq!(
            tz.to_local(date(2023, 1, 1), 0.0, 15, false),
            Err(TimezoneError::OffsetOutOfRange(15))
        );
        assert!(tz.to_local(date(2023, 1, 1), f64::NAN, 0, false).is_err());
    }

    #[test]
    fn test_to_local_fails_past_supported_years() {
        let tz = normalizer();
        assert!(matches!(
            tz.to_local(date(9999, 12, 31), 86000.0, 1, false),
            Err(TimezoneError::Calendar(CalendarError::InvalidDate(_)))
        ));
        assert!(matches!(
            tz.to_local(date(1000, 1, 1), 0.0, -1, false),
            Err(TimezoneError::Calendar(CalendarError::InvalidDate(_)))
        ));
        // Staying on the same day is fine at either edge
        let local = tz.to_local(date(9999, 12, 31), 3600.0, 1, false).unwrap();
        assert_eq!(local.date, date(9999, 12, 31));
        assert_eq!(local.seconds, 7200.0);
    }
}
