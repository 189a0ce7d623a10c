//! Detector deployment records
//!
//! Each detector unit has one JSON record per deployment, named
//! `{unit}_{location}_{start}.json`, which names the nearest weather station and
//! the deployment's date span. Only those three fields are read; everything
//! else in the record is ignored.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::{date_span, Calendar, CalendarDate, CalendarError};

/// Errors that can occur when reading a deployment record
#[derive(Debug, Error)]
pub enum DeploymentError {
    /// The record file could not be read
    #[error("Failed to read deployment record '{0}': {1}")]
    Io(PathBuf, #[source] io::Error),

    /// The record is not JSON or lacks a required field
    #[error("Failed to parse deployment record '{0}': {1}")]
    Json(PathBuf, #[source] serde_json::Error),

    /// The start or end date is not a valid date
    #[error("Invalid date in deployment record: {0}")]
    Date(#[from] CalendarError),
}

/// The fields of a deployment record the backfill driver needs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeploymentRecord {
    /// Call sign of the closest weather station
    #[serde(rename = "Nearest weather station")]
    pub station: String,

    /// First day of the deployment, compact or expanded form
    #[serde(rename = "Start date")]
    pub start_date: String,

    /// Last day of the deployment, inclusive
    #[serde(rename = "End date")]
    pub end_date: String,
}

impl DeploymentRecord {
    /// Reads and parses a deployment record file
    pub fn read(path: &Path) -> Result<Self, DeploymentError> {
        let content =
            fs::read_to_string(path).map_err(|e| DeploymentError::Io(path.to_path_buf(), e))?;
        serde_json::from_str(&content).map_err(|e| DeploymentError::Json(path.to_path_buf(), e))
    }

    /// Every date of the deployment, start to end inclusive
    ///
    /// # Returns
    /// * `Ok(Vec<CalendarDate>)` - Empty when the end date precedes the start date
    /// * `Err(DeploymentError::Date)` - If either date is malformed or lies
    ///   outside the century the stored tables are keyed by
    pub fn dates(&self, calendar: &Calendar) -> Result<Vec<CalendarDate>, DeploymentError> {
        let start = calendar.parse_any(&self.start_date)?;
        let end = calendar.parse_any(&self.end_date)?;
        // Every day between two in-century endpoints is in-century too
        calendar.to_compact(start)?;
        calendar.to_compact(end)?;
        Ok(date_span(start, end))
    }
}

/// Lists the deployment record files of `unit` in `dir`, sorted by name
///
/// Matches `{unit}_*_*.json`. A missing directory yields an empty list.
pub fn deployment_files(dir: &Path, unit: &str) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let prefix = format!("{}_", unit);
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let matches = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".json"))
            .is_some_and(|middle| middle.contains('_'));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
