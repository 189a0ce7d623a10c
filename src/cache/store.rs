//! On-disk store for observation tables and the resolved set
//!
//! Provides a `WeatherStore` that writes serializable data as JSON files in one
//! directory: a table file per resolved station-date, the resolved set itself,
//! and the driver's lock file.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::ResolvedSet;
use crate::data::{CalendarDate, ObservationTable};

/// File name of the persisted resolved set
pub const RESOLVED_FILE: &str = "checked_dates";

/// File name of the driver lock
pub const LOCK_FILE: &str = "pid.txt";

/// Errors that can occur when reading or writing the store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Directory creation, read or write failed
    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),

    /// A stored file is not valid JSON for its type
    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An observation table as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTable {
    /// Station call sign
    pub station: String,
    /// Local calendar date of the table
    pub date: CalendarDate,
    /// When the table was fetched
    pub fetched_at: DateTime<Utc>,
    pub table: ObservationTable,
}

/// Reads and writes the weather directory
///
/// Every key maps to `{dir}/{key}.json`. Writes replace the whole file.
#[derive(Debug, Clone)]
pub struct WeatherStore {
    /// Directory where all files are stored
    dir: PathBuf,
}

impl WeatherStore {
    /// Creates a store in the platform data directory
    ///
    /// Uses `~/.local/share/wxscrape/Weather` on Linux.
    /// Returns `None` if no home directory can be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "wxscrape")?;
        Some(Self::with_dir(project_dirs.data_dir().join("Weather")))
    }

    /// Creates a store rooted at `dir`
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the driver lock file
    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    /// Ensures the store directory exists
    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Key of the table file for a station and compact date
    pub fn table_key(station: &str, compact_date: &str) -> String {
        format!("{}_{}", station, compact_date)
    }

    /// Writes `data` under `key`, creating the directory if needed
    pub fn write<T: Serialize>(&self, key: &str, data: &T) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let json = serde_json::to_string(data)?;
        fs::write(self.path(key), json)?;
        Ok(())
    }

    /// Reads the value stored under `key`
    ///
    /// # Returns
    /// * `Ok(None)` if nothing is stored under the key
    /// * `Ok(Some(T))` if the file exists and parses
    /// * `Err(StoreError)` if the file cannot be read or parsed
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let content = match fs::read_to_string(self.path(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Persists a fetched table as `{station}_{yymmdd}.json`
    pub fn write_table(
        &self,
        station: &str,
        compact_date: &str,
        date: CalendarDate,
        table: &ObservationTable,
    ) -> Result<(), StoreError> {
        let stored = StoredTable {
            station: station.to_string(),
            date,
            fetched_at: Utc::now(),
            table: table.clone(),
        };
        self.write(&Self::table_key(station, compact_date), &stored)
    }

    /// Reads a previously stored table
    pub fn read_table(&self, station: &str, compact_date: &str) -> Result<Option<StoredTable>, StoreError> {
        self.read(&Self::table_key(station, compact_date))
    }

    /// Loads the resolved set; a missing file is an empty set
    pub fn load_resolved(&self) -> Result<ResolvedSet, StoreError> {
        Ok(self.read(RESOLVED_FILE)?.unwrap_or_default())
    }

    /// Overwrites the persisted resolved set
    pub fn save_resolved(&self, resolved: &ResolvedSet) -> Result<(), StoreError> {
        self.write(RESOLVED_FILE, resolved)
    }
}
