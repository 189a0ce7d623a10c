//! Weather at the time of a single detector event
//!
//! Converts the event to station local time, fetches that local day's table and
//! classifies the hours around the closest observation.

use thiserror::Error;
use tracing::debug;

use crate::data::{
    parse_expanded, CalendarError, ConditionClass, LocalInstant, ObservationFetcher,
    ObservationWindow, TimezoneError, TimezoneNormalizer, DEFAULT_PADDING,
};

/// Summary text used when no table could be retrieved
pub const NOT_FOUND_SUMMARY: &str = "Not found";

/// Errors that make an event lookup impossible
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    #[error(transparent)]
    Timezone(#[from] TimezoneError),
}

impl From<CalendarError> for LookupError {
    fn from(error: CalendarError) -> Self {
        LookupError::Timezone(TimezoneError::Calendar(error))
    }
}

/// A detector event to look up
#[derive(Debug, Clone, PartialEq)]
pub struct EventRequest {
    /// Event date as `yyyy-mm-dd` in the detector's reference timezone
    pub date: String,
    /// Event time in seconds since midnight in the reference timezone
    pub seconds: f64,
    /// Call sign of the closest station
    pub station: String,
    /// Offset from the reference timezone to local standard time
    pub utc_offset_hours: i32,
    /// Whether the station's region observes daylight saving
    pub observe_dst: bool,
}

/// Weather around an event
#[derive(Debug, Clone, PartialEq)]
pub struct EventWeather {
    /// The event in station local time
    pub local: LocalInstant,
    pub class: ConditionClass,
    /// Human-readable conditions around the event, or "Not found"
    pub summary: String,
}

/// Looks up the weather at the time of an event
///
/// # Returns
/// * `Ok(EventWeather)` - `Failure`/"Not found" when the table is unavailable
/// * `Err(LookupError)` - If the date is malformed or the time/offset out of range
pub async fn weather_at_event<F: ObservationFetcher>(
    fetcher: &F,
    normalizer: &TimezoneNormalizer,
    request: &EventRequest,
) -> Result<EventWeather, LookupError> {
    let date = parse_expanded(&request.date)?;
    let local = normalizer.to_local(
        date,
        request.seconds,
        request.utc_offset_hours,
        request.observe_dst,
    )?;
    debug!(station = %request.station, date = %local.date, seconds = local.seconds, "event in local time");

    let weather = match fetcher.fetch(local.date, &request.station).await {
        Ok(table) => {
            let window = ObservationWindow::around(&table.observations(), local.seconds, DEFAULT_PADDING);
            EventWeather {
                local,
                class: window.classify(),
                summary: window.summary(),
            }
        }
        Err(_) => EventWeather {
            local,
            class: ConditionClass::Failure,
            summary: NOT_FOUND_SUMMARY.to_string(),
        },
    };
    Ok(weather)
}
