//! Configuration for the calendar arithmetic and the backfill driver
//!
//! `TimeConstants` is an immutable value handed to `Calendar` and
//! `TimezoneNormalizer` at construction. `BackfillConfig` is read from an
//! optional TOML file and falls back to the detector fleet defaults.

use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::DEFAULT_WEBDRIVER_URL;

/// Default number of fetch attempts per station-date pair
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default upstream request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Root of the detector deployment archive
const DETECTOR_ROOT: &str = "/media/AllDetectorData/Detectors";

/// Errors that can occur when loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),

    /// The file is not valid TOML or has unknown keys
    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Fixed constants used by the date and time-of-day arithmetic
///
/// The compact `yymmdd` date form only stores two year digits; `century` supplies
/// the missing prefix, so compact dates are bound to a single century.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeConstants {
    /// Seconds after midnight at which DST starts and ends
    pub two_am: f64,
    pub sec_per_hour: f64,
    pub sec_per_day: f64,
    /// Century prefix of compact dates (20 => 20yy)
    pub century: i32,
}

impl Default for TimeConstants {
    fn default() -> Self {
        Self {
            two_am: 7200.0,
            sec_per_hour: 3600.0,
            sec_per_day: 86400.0,
            century: 20,
        }
    }
}

/// One monitored detector and the directory holding its deployment records
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConfig {
    /// Detector name, used as the deployment file prefix (e.g. "THOR1")
    pub name: String,
    /// Directory containing `{name}_*_*.json` deployment records
    pub deployment_dir: PathBuf,
}

impl UnitConfig {
    pub fn new(name: impl Into<String>, deployment_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            deployment_dir: deployment_dir.into(),
        }
    }
}

/// How history pages are loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Render pages in headless Chrome through a WebDriver server
    #[default]
    Browser,
    /// Download pages over plain HTTP
    Http,
}

/// Settings for the backfill driver
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackfillConfig {
    /// Where tables, the resolved set and the lock file live
    #[serde(default = "default_weather_dir")]
    pub weather_dir: PathBuf,

    /// Fetch attempts per pair before giving up until the next run
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Timeout applied to each upstream request, and how long a rendered
    /// page may take to show its table
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Whether pages are rendered in a browser or downloaded
    #[serde(default)]
    pub fetch_mode: FetchMode,

    /// WebDriver server used in browser mode
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Detectors to backfill, in order
    #[serde(default = "default_units")]
    pub units: Vec<UnitConfig>,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            weather_dir: default_weather_dir(),
            max_attempts: default_max_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
            fetch_mode: FetchMode::default(),
            webdriver_url: default_webdriver_url(),
            units: default_units(),
        }
    }
}

impl BackfillConfig {
    /// Loads a config file, filling every missing key with its default
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml(&text)
    }

    /// Parses a config from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

fn default_weather_dir() -> PathBuf {
    ProjectDirs::from("", "", "wxscrape")
        .map(|dirs| dirs.data_dir().join("Weather"))
        .unwrap_or_else(|| PathBuf::from("Weather"))
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_webdriver_url() -> String {
    DEFAULT_WEBDRIVER_URL.to_string()
}

fn default_units() -> Vec<UnitConfig> {
    let root = Path::new(DETECTOR_ROOT);
    let mut units: Vec<UnitConfig> = (1..=6)
        .map(|n| UnitConfig::new(format!("THOR{}", n), root.join("THOR")))
        .collect();
    units.push(UnitConfig::new("GODOT", root.join("GODOT")));
    units.push(UnitConfig::new("SANTIS", root.join("SANTIS")));
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_time_constants_default() {
        let constants = TimeConstants::default();
        assert_eq!(constants.two_am, 7200.0);
        assert_eq!(constants.sec_per_hour, 3600.0);
        assert_eq!(constants.sec_per_day, 86400.0);
        assert_eq!(constants.century, 20);
    }

    #[test]
    fn test_default_units_cover_detector_fleet() {
        let config = BackfillConfig::default();
        let names: Vec<&str> = config.units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(
            names,
            ["THOR1", "THOR2", "THOR3", "THOR4", "THOR5", "THOR6", "GODOT", "SANTIS"]
        );
        assert_eq!(
            config.units[0].deployment_dir,
            PathBuf::from("/media/AllDetectorData/Detectors/THOR")
        );
        assert_eq!(config.max_attempts, 10);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = BackfillConfig::from_toml("").expect("Empty config should parse");
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.units.len(), 8);
        assert!(config.weather_dir.ends_with("Weather"));
        assert_eq!(config.fetch_mode, FetchMode::Browser);
        assert_eq!(config.webdriver_url, "http://localhost:9515");
    }

    #[test]
    fn test_fetch_mode_from_toml() {
        let config = BackfillConfig::from_toml(
            "fetch_mode = \"http\"\nwebdriver_url = \"http://10.0.0.2:4444\"\n",
        )
        .expect("Config should parse");
        assert_eq!(config.fetch_mode, FetchMode::Http);
        assert_eq!(config.webdriver_url, "http://10.0.0.2:4444");

        let result = BackfillConfig::from_toml("fetch_mode = \"curl\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_toml_overrides() {
        let text = r#"
            weather_dir = "/tmp/weather"
            max_attempts = 3

            [[units]]
            name = "THOR7"
            deployment_dir = "/data/THOR"
        "#;
        let config = BackfillConfig::from_toml(text).expect("Config should parse");
        assert_eq!(config.weather_dir, PathBuf::from("/tmp/weather"));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.units, vec![UnitConfig::new("THOR7", "/data/THOR")]);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = BackfillConfig::from_toml("retries = 4");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = BackfillConfig::load(&temp_dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_, _))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("wxscrape.toml");
        fs::write(&path, "max_attempts = 5\n").expect("Should write config");

        let config = BackfillConfig::load(&path).expect("Config should load");
        assert_eq!(config.max_attempts, 5);
    }
}
