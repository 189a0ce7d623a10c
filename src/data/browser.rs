//! History pages rendered in a headless browser
//!
//! The observation table on the history site is filled in by scripts after the
//! page loads, so a plain download usually sees only the summary table. This
//! client drives headless Chrome through a WebDriver server (e.g. chromedriver),
//! waits for the observation table to appear and hands the rendered document
//! to the same parser as the HTTP client.

use std::time::Duration;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;
use tokio::time::{sleep, Instant};
use tracing::debug;

use super::observations::{
    history_url, parse_history_page, FetchUnavailable, ObservationFetcher, ObservationTable,
    PageError, HISTORY_BASE_URL, OBSERVATION_TABLE_INDEX,
};
use super::CalendarDate;

/// Address chromedriver listens on by default
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Delay between checks for the rendered table
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Client that loads each history page in a fresh headless browser session
#[derive(Debug, Clone)]
pub struct BrowserClient {
    server_url: String,
    page_wait: Duration,
    base_url: String,
}

impl BrowserClient {
    /// Creates a client for the WebDriver server at `server_url`
    ///
    /// # Arguments
    /// * `server_url` - WebDriver endpoint, e.g. [`DEFAULT_WEBDRIVER_URL`]
    /// * `page_wait` - How long to wait for the observation table to render
    pub fn new(server_url: impl Into<String>, page_wait: Duration) -> Self {
        Self {
            server_url: server_url.into(),
            page_wait,
            base_url: HISTORY_BASE_URL.to_string(),
        }
    }

    /// Overrides the base URL of the history pages
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Returns the history page URL for a station-date
    pub fn page_url(&self, date: CalendarDate, station: &str) -> String {
        history_url(&self.base_url, date, station)
    }

    async fn fetch_page(&self, date: CalendarDate, station: &str) -> Result<ObservationTable, PageError> {
        let mut caps = DesiredCapabilities::chrome();
        caps.set_headless()?;
        let driver = WebDriver::new(self.server_url.as_str(), caps).await?;

        let rendered = self.rendered_source(&driver, &self.page_url(date, station)).await;
        // The session is closed whether or not the page loaded
        if let Err(e) = driver.quit().await {
            debug!(error = %e, "failed to close browser session");
        }

        let html = rendered?;
        parse_history_page(&html).ok_or(PageError::MissingTable)
    }

    /// Loads `url` and returns the document once the observation table exists
    async fn rendered_source(&self, driver: &WebDriver, url: &str) -> Result<String, PageError> {
        driver.goto(url).await?;

        let deadline = Instant::now() + self.page_wait;
        while driver.find_all(By::Tag("table")).await?.len() <= OBSERVATION_TABLE_INDEX {
            if Instant::now() >= deadline {
                return Err(PageError::MissingTable);
            }
            sleep(POLL_INTERVAL).await;
        }
        Ok(driver.source().await?)
    }
}

impl ObservationFetcher for BrowserClient {
    async fn fetch(
        &self,
        date: CalendarDate,
        station: &str,
    ) -> Result<ObservationTable, FetchUnavailable> {
        self.fetch_page(date, station).await.map_err(|e| {
            debug!(station, %date, error = %e, "rendered history page unavailable");
            FetchUnavailable
        })
    }
}
