//! Observation tables and the upstream weather-history client
//!
//! The history page for a station-day publishes an hourly table with a `Time`
//! column in `h:mm AM/PM` form and a free-text `Condition` column. This module
//! keeps the full table as published and projects the rows the matcher needs.

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::browser::BrowserClient;
use super::CalendarDate;

/// Base URL of the daily history pages
pub(crate) const HISTORY_BASE_URL: &str = "https://www.wunderground.com/history/daily";

/// Header of the time-of-day column
pub const TIME_COLUMN: &str = "Time";

/// Header of the weather condition column
pub const CONDITION_COLUMN: &str = "Condition";

/// The page's observation table is the second table in the document
pub(crate) const OBSERVATION_TABLE_INDEX: usize = 1;

/// The upstream table for a station-date could not be retrieved
///
/// Network failures, bad statuses and unparsable pages all collapse to this
/// value; the cause is only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Observation table unavailable")]
pub struct FetchUnavailable;

/// Source of observation tables for a station and date
#[allow(async_fn_in_trait)]
pub trait ObservationFetcher {
    /// Fetches the observation table of `station` for the local calendar `date`
    ///
    /// Implementations make a single attempt; retrying is up to the caller.
    async fn fetch(
        &self,
        date: CalendarDate,
        station: &str,
    ) -> Result<ObservationTable, FetchUnavailable>;
}

/// A single row of the valid table prefix
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Time label as published (e.g. "3:53 PM")
    pub time_label: String,
    /// Seconds since local midnight
    pub seconds: f64,
    /// Condition text, `None` when the cell is empty
    pub condition: Option<String>,
}

/// An hourly observation table for one station-day, as published upstream
///
/// Rows keep every column; empty cells are `None`. The table may have a ragged
/// tail of rows without a usable time, which [`ObservationTable::observations`]
/// cuts off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ObservationTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// Builds a two-column `Time`/`Condition` table
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let rows = pairs
            .into_iter()
            .map(|(time, condition)| {
                vec![Some(time.to_string()), condition.map(str::to_string)]
            })
            .collect();
        Self::new(
            vec![TIME_COLUMN.to_string(), CONDITION_COLUMN.to_string()],
            rows,
        )
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of a column by header name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the chronological rows up to the first row without a valid time
    pub fn observations(&self) -> Vec<Observation> {
        let Some(time_idx) = self.column_index(TIME_COLUMN) else {
            return Vec::new();
        };
        let condition_idx = self.column_index(CONDITION_COLUMN);

        let mut observations = Vec::new();
        for row in &self.rows {
            let Some(label) = row.get(time_idx).and_then(|cell| cell.as_deref()) else {
                break;
            };
            let Ok(seconds) = parse_clock_label(label) else {
                break;
            };
            let condition = condition_idx
                .and_then(|idx| row.get(idx))
                .and_then(|cell| cell.clone());
            observations.push(Observation {
                time_label: label.to_string(),
                seconds,
                condition,
            });
        }
        observations
    }
}

/// Errors from parsing an `h:mm AM/PM` clock label
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid clock label: '{0}'")]
pub struct ClockLabelError(pub String);

/// Converts a 12-hour clock label such as "12:53 AM" to seconds since midnight
pub fn parse_clock_label(label: &str) -> Result<f64, ClockLabelError> {
    let invalid = || ClockLabelError(label.to_string());

    let mut parts = label.split_whitespace();
    let (Some(clock), Some(meridiem), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let (hour, minute) = clock.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&hour) || minute >= 60 {
        return Err(invalid());
    }

    let hour = match (meridiem, hour) {
        ("AM", 12) => 0,
        ("AM", h) => h,
        ("PM", 12) => 12,
        ("PM", h) => h + 12,
        _ => return Err(invalid()),
    };
    Ok(f64::from(hour * 3600 + minute * 60))
}

/// Errors that can occur while loading a history page
#[derive(Debug, Error)]
pub enum PageError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The browser session failed or could not be started
    #[error("Browser session failed: {0}")]
    Browser(#[from] thirtyfour::error::WebDriverError),

    /// The page did not contain the observation table
    #[error("Observation table missing from page")]
    MissingTable,
}

/// Builds the history page URL for a station-date under `base_url`
pub(crate) fn history_url(base_url: &str, date: CalendarDate, station: &str) -> String {
    format!("{}/{}/date/{}", base_url, station, date)
}

/// Plain HTTP client for the daily history pages
///
/// Only sees the table when the server renders it into the page. Pages that
/// build the table in the browser need [`BrowserClient`].
#[derive(Debug, Clone)]
pub struct WundergroundClient {
    client: Client,
    base_url: String,
}

impl WundergroundClient {
    /// Creates a client whose requests time out after `timeout`
    ///
    /// # Returns
    /// * `Err(reqwest::Error)` if the TLS backend cannot be initialized
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wxscrape/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: HISTORY_BASE_URL.to_string(),
        })
    }

    /// Overrides the base URL of the history pages
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns the history page URL for a station-date
    pub fn page_url(&self, date: CalendarDate, station: &str) -> String {
        history_url(&self.base_url, date, station)
    }

    async fn fetch_page(&self, date: CalendarDate, station: &str) -> Result<ObservationTable, PageError> {
        let response = self
            .client
            .get(self.page_url(date, station))
            .send()
            .await?
            .error_for_status()?;
        let html = response.text().await?;
        parse_history_page(&html).ok_or(PageError::MissingTable)
    }
}

impl ObservationFetcher for WundergroundClient {
    async fn fetch(
        &self,
        date: CalendarDate,
        station: &str,
    ) -> Result<ObservationTable, FetchUnavailable> {
        self.fetch_page(date, station).await.map_err(|e| {
            debug!(station, %date, error = %e, "history page unavailable");
            FetchUnavailable
        })
    }
}

/// The configured way of loading history pages
#[derive(Debug, Clone)]
pub enum HistoryFetcher {
    /// Renders each page in a headless browser
    Browser(BrowserClient),
    /// Downloads each page over plain HTTP
    Http(WundergroundClient),
}

impl ObservationFetcher for HistoryFetcher {
    async fn fetch(
        &self,
        date: CalendarDate,
        station: &str,
    ) -> Result<ObservationTable, FetchUnavailable> {
        match self {
            Self::Browser(client) => client.fetch(date, station).await,
            Self::Http(client) => client.fetch(date, station).await,
        }
    }
}

/// Extracts the observation table from a history page
///
/// Returns `None` if the page has no observation table or the table has no rows.
pub fn parse_history_page(html: &str) -> Option<ObservationTable> {
    let table_sel = Selector::parse("table").ok()?;
    let header_sel = Selector::parse("thead th").ok()?;
    let row_sel = Selector::parse("tbody tr").ok()?;
    let cell_sel = Selector::parse("td").ok()?;

    let doc = Html::parse_document(html);
    let table = doc.select(&table_sel).nth(OBSERVATION_TABLE_INDEX)?;

    let columns: Vec<String> = table
        .select(&header_sel)
        .map(|th| cell_text(&th))
        .collect();
    if columns.is_empty() {
        return None;
    }

    let rows: Vec<Vec<Option<String>>> = table
        .select(&row_sel)
        .map(|tr| {
            tr.select(&cell_sel)
                .map(|td| Some(cell_text(&td)).filter(|text| !text.is_empty()))
                .collect()
        })
        .collect();
    if rows.is_empty() {
        return None;
    }

    Some(ObservationTable::new(columns, rows))
}

/// Collapses an element's text nodes into one whitespace-normalized string
fn cell_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Trimmed history page: a summary table followed by the observation table
    const HISTORY_PAGE: &str = r#"<html><body>
        <table><thead><tr><th>Summary</th></tr></thead>
            <tbody><tr><td>High Temp</td></tr></tbody></table>
        <table>
            <thead><tr>
                <th>Time</th><th>Temperature</th><th>Wind</th><th>Condition</th>
            </tr></thead>
            <tbody>
                <tr><td><span>12:53 AM</span></td><td>61 °F</td><td>SW</td><td>Fair</td></tr>
                <tr><td>1:53 AM</td><td>60 °F</td><td>CALM</td><td>Partly   Cloudy</td></tr>
                <tr><td>2:53 AM</td><td>59 °F</td><td></td><td>T-Storm</td></tr>
                <tr><td></td><td></td><td></td><td></td></tr>
            </tbody>
        </table>
    </body></html>"#;

    #[test]
    fn test_parse_clock_label() {
        assert_eq!(parse_clock_label("12:00 AM").unwrap(), 0.0);
        assert_eq!(parse_clock_label("12:53 AM").unwrap(), 53.0 * 60.0);
        assert_eq!(parse_clock_label("1:53 AM").unwrap(), 3600.0 + 53.0 * 60.0);
        assert_eq!(parse_clock_label("12:00 PM").unwrap(), 12.0 * 3600.0);
        assert_eq!(parse_clock_label("3:53 PM").unwrap(), 15.0 * 3600.0 + 53.0 * 60.0);
        assert_eq!(parse_clock_label("11:59 PM").unwrap(), 86340.0);
    }

    #[test]
    fn test_parse_clock_label_invalid() {
        assert!(parse_clock_label("").is_err());
        assert!(parse_clock_label("13:00 PM").is_err());
        assert!(parse_clock_label("0:30 AM").is_err());
        assert!(parse_clock_label("3:60 AM").is_err());
        assert!(parse_clock_label("3:53").is_err());
        assert!(parse_clock_label("3:53 XM").is_err());
        assert!(parse_clock_label("nan").is_err());
    }

    #[test]
    fn test_observations_stop_at_ragged_tail() {
        let table = ObservationTable::new(
            vec!["Time".to_string(), "Condition".to_string()],
            vec![
                vec![Some("12:53 AM".to_string()), Some("Fair".to_string())],
                vec![Some("1:53 AM".to_string()), None],
                vec![None, None],
                vec![Some("3:53 AM".to_string()), Some("Rain".to_string())],
            ],
        );

        let observations = table.observations();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].condition.as_deref(), Some("Fair"));
        assert_eq!(observations[1].condition, None);
        assert_eq!(observations[1].seconds, 3600.0 + 53.0 * 60.0);
    }

    #[test]
    fn test_observations_stop_at_malformed_time() {
        let table = ObservationTable::from_pairs([
            ("12:53 AM", Some("Fair")),
            ("garbage", Some("Rain")),
            ("2:53 AM", Some("Rain")),
        ]);
        assert_eq!(table.observations().len(), 1);
    }

    #[test]
    fn test_observations_without_time_column() {
        let table = ObservationTable::new(
            vec!["Temperature".to_string()],
            vec![vec![Some("61 °F".to_string())]],
        );
        assert!(table.observations().is_empty());
    }

    #[test]
    fn test_parse_history_page_uses_second_table() {
        let table = parse_history_page(HISTORY_PAGE).expect("Should find observation table");

        assert_eq!(table.columns, ["Time", "Temperature", "Wind", "Condition"]);
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows[1][3].as_deref(), Some("Partly Cloudy"));
        assert_eq!(table.rows[2][2], None);

        let observations = table.observations();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].time_label, "12:53 AM");
        assert_eq!(observations[2].condition.as_deref(), Some("T-Storm"));
    }

    #[test]
    fn test_parse_history_page_without_table() {
        assert!(parse_history_page("<html><body><p>Loading...</p></body></html>").is_none());

        let single_table = "<table><thead><tr><th>Time</th></tr></thead></table>";
        assert!(parse_history_page(single_table).is_none());
    }

    #[test]
    fn test_parse_history_page_with_empty_body() {
        let page = r#"<table></table>
            <table><thead><tr><th>Time</th><th>Condition</th></tr></thead><tbody></tbody></table>"#;
        assert!(parse_history_page(page).is_none());
    }

    #[test]
    fn test_table_serialization_keeps_missing_cells() {
        let table = ObservationTable::from_pairs([("12:53 AM", Some("Fair")), ("1:53 AM", None)]);
        let json = serde_json::to_string(&table).expect("Failed to serialize table");
        assert!(json.contains("null"));

        let deserialized: ObservationTable =
            serde_json::from_str(&json).expect("Failed to deserialize table");
        assert_eq!(deserialized, table);
    }

    #[test]
    fn test_page_url() {
        let client = WundergroundClient::new(Duration::from_secs(20))
            .expect("Client should build with a timeout");
        let date = CalendarDate::new(2023, 7, 4).unwrap();
        assert_eq!(
            client.page_url(date, "KDEN"),
            "https://www.wunderground.com/history/daily/KDEN/date/2023-07-04"
        );

        let client = client.with_base_url("http://localhost:9");
        assert_eq!(client.page_url(date, "KDEN"), "http://localhost:9/KDEN/date/2023-07-04");
    }

    #[tokio::test]
    async fn test_fetch_collapses_connection_errors() {
        let client = WundergroundClient::new(Duration::from_millis(500))
            .expect("Client should build")
            .with_base_url("http://127.0.0.1:9");
        let date = CalendarDate::new(2023, 7, 4).unwrap();

        let result = client.fetch(date, "KDEN").await;
        assert_eq!(result, Err(FetchUnavailable));
    }

    #[tokio::test]
    async fn test_history_fetcher_delegates_to_http_client() {
        let client = WundergroundClient::new(Duration::from_millis(500))
            .expect("Client should build")
            .with_base_url("http://127.0.0.1:9");
        let fetcher = HistoryFetcher::Http(client);
        let date = CalendarDate::new(2023, 7, 4).unwrap();

        assert_eq!(fetcher.fetch(date, "KDEN").await, Err(FetchUnavailable));
    }
}
