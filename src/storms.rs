//! Interactive thunderstorm scan over a date range
//!
//! Prompts for two dates and a station (unless given on the command line),
//! fetches each day in the range and reports every lightning or hail
//! observation. Every line is written to the terminal and mirrored to a log
//! file.

use std::io::{self, BufRead, Write};
use tracing::debug;

use crate::data::{
    date_span, parse_expanded, storm_reports, CalendarDate, ObservationFetcher,
};

/// Default log file of the scan
pub const DEFAULT_LOG_FILE: &str = "Lightning_Summary.txt";

/// Shown before re-prompting for a malformed date
pub const INVALID_DATE_MESSAGE: &str = "Not a valid date.";

/// Reported for a day with no lightning or hail
pub const NOTHING_FOUND: &str = "Nothing found";

/// Reported for a day whose table could not be fetched
pub const TABLE_ERROR: &str = "Error getting table";

/// A station and an inclusive date range to scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StormQuery {
    pub from: CalendarDate,
    pub to: CalendarDate,
    pub station: String,
}

impl StormQuery {
    /// Dates of the range in order; a reversed range is scanned forwards
    pub fn dates(&self) -> Vec<CalendarDate> {
        if self.to < self.from {
            date_span(self.to, self.from)
        } else {
            date_span(self.from, self.to)
        }
    }
}

/// Reads one trimmed line after printing `message`
///
/// Fails with `UnexpectedEof` when the input is closed.
pub fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    message: &str,
) -> io::Result<String> {
    write!(output, "{}", message)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
    }
    Ok(line.trim().to_string())
}

/// Prompts until the answer is a valid `yyyy-mm-dd` date
pub fn prompt_date<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    message: &str,
) -> io::Result<CalendarDate> {
    loop {
        let answer = prompt_line(input, output, message)?;
        match parse_expanded(&answer) {
            Ok(date) => return Ok(date),
            Err(_) => writeln!(output, "{}", INVALID_DATE_MESSAGE)?,
        }
    }
}

/// Builds a query, prompting for whichever parts were not supplied
pub fn complete_query<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    from: Option<CalendarDate>,
    to: Option<CalendarDate>,
    station: Option<String>,
) -> io::Result<StormQuery> {
    let from = match from {
        Some(date) => date,
        None => prompt_date(input, output, "Enter the first date (yyyy-mm-dd): ")?,
    };
    let to = match to {
        Some(date) => date,
        None => prompt_date(input, output, "Enter the second date (yyyy-mm-dd): ")?,
    };
    let station = match station {
        Some(station) => station,
        None => prompt_line(
            input,
            output,
            "Enter the nearest weather station (4-letter call sign): ",
        )?,
    };
    Ok(StormQuery { from, to, station })
}

/// Report lines for one day, without the trailing blank line
pub async fn scan_date<F: ObservationFetcher>(
    fetcher: &F,
    date: CalendarDate,
    station: &str,
) -> Vec<String> {
    let mut lines = vec![format!("{}:", date)];
    match fetcher.fetch(date, station).await {
        Ok(table) => {
            let reports = storm_reports(&table.observations());
            if reports.is_empty() {
                lines.push(NOTHING_FOUND.to_string());
            } else {
                lines.extend(reports);
            }
        }
        Err(_) => lines.push(TABLE_ERROR.to_string()),
    }
    lines
}

/// Scans every day of the query, writing each block to `output` and `log`
///
/// Each day is written as soon as it has been fetched.
pub async fn run_storm_query<F, W, L>(
    fetcher: &F,
    query: &StormQuery,
    output: &mut W,
    log: &mut L,
) -> io::Result<()>
where
    F: ObservationFetcher,
    W: Write,
    L: Write,
{
    for date in query.dates() {
        debug!(station = %query.station, %date, "scanning for storms");
        let mut lines = scan_date(fetcher, date, &query.station).await;
        lines.push(String::new());
        for line in &lines {
            writeln!(output, "{}", line)?;
            writeln!(log, "{}", line)?;
        }
        output.flush()?;
    }
    log.flush()
}
