//! Command-line interface parsing for wxscrape
//!
//! This module handles parsing of CLI arguments using clap: the global
//! verbosity and config flags and the `backfill`, `storms` and `event`
//! subcommands. Date arguments are checked at parse time.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::data::{parse_expanded, CalendarDate};
use crate::storms::DEFAULT_LOG_FILE;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The date is not a real date in `yyyy-mm-dd` form
    #[error("Invalid date: '{0}'. Expected yyyy-mm-dd")]
    InvalidDate(String),
}

/// wxscrape - Historical station weather for detector events
#[derive(Parser, Debug)]
#[command(name = "wxscrape")]
#[command(about = "Historical station weather for detector events")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and store every deployment day not stored yet
    Backfill(BackfillArgs),
    /// Report thunderstorm and hail observations over a date range
    Storms(StormsArgs),
    /// Classify the weather at the time of a single event
    Event(EventArgs),
}

/// Arguments for the `backfill` subcommand
#[derive(Args, Debug)]
pub struct BackfillArgs {
    /// Override the weather directory from the config
    #[arg(long, value_name = "DIR")]
    pub weather_dir: Option<PathBuf>,
}

/// Arguments for the `storms` subcommand
///
/// Anything left out is prompted for.
#[derive(Args, Debug)]
pub struct StormsArgs {
    /// First date of the range (yyyy-mm-dd)
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<CalendarDate>,

    /// Last date of the range, inclusive (yyyy-mm-dd)
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<CalendarDate>,

    /// Nearest weather station (4-letter call sign)
    #[arg(long)]
    pub station: Option<String>,

    /// File the report is mirrored to
    #[arg(long, value_name = "FILE", default_value = DEFAULT_LOG_FILE)]
    pub log: PathBuf,
}

/// Arguments for the `event` subcommand
#[derive(Args, Debug)]
pub struct EventArgs {
    /// Event date in the reference timezone (yyyy-mm-dd)
    #[arg(long)]
    pub date: String,

    /// Event time in seconds since midnight
    #[arg(long)]
    pub time: f64,

    /// Nearest weather station (4-letter call sign)
    #[arg(long)]
    pub station: String,

    /// Hours from the reference timezone to the station's standard time
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub utc_offset: i32,

    /// The station's region observes daylight saving time
    #[arg(long)]
    pub dst: bool,

    /// Print the conditions around the event instead of the class code
    #[arg(long)]
    pub summary: bool,
}

/// Parses a date argument in strict `yyyy-mm-dd` form.
///
/// # Arguments
/// * `s` - The date string from CLI
///
/// # Returns
/// * `Ok(CalendarDate)` if the string has the right shape and names a real day
/// * `Err(CliError::InvalidDate)` otherwise
pub fn parse_date_arg(s: &str) -> Result<CalendarDate, CliError> {
    parse_expanded(s).map_err(|_| CliError::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_arg_valid() {
        assert_eq!(
            parse_date_arg("2023-01-01").unwrap(),
            CalendarDate::new(2023, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_parse_date_arg_invalid() {
        for bad in ["2023/01/01", "23-01-01", "2023-02-29", ""] {
            let result = parse_date_arg(bad);
            assert!(result.is_err(), "{bad:?} should be rejected");
        }
        let err = parse_date_arg("2023/01/01").unwrap_err();
        assert!(err.to_string().contains("Invalid date"));
        assert!(err.to_string().contains("2023/01/01"));
    }

    #[test]
    fn test_cli_parse_backfill() {
        let cli = Cli::parse_from(["wxscrape", "backfill"]);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
        match cli.command {
            Commands::Backfill(args) => assert!(args.weather_dir.is_none()),
            other => panic!("Expected backfill, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["wxscrape", "backfill", "-vv", "--config", "wx.toml"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("wx.toml")));
    }

    #[test]
    fn test_cli_parse_storms_defaults() {
        let cli = Cli::parse_from(["wxscrape", "storms"]);
        let Commands::Storms(args) = cli.command else {
            panic!("Expected storms");
        };
        assert!(args.from.is_none());
        assert!(args.to.is_none());
        assert!(args.station.is_none());
        assert_eq!(args.log, PathBuf::from("Lightning_Summary.txt"));
    }

    #[test]
    fn test_cli_parse_storms_with_range() {
        let cli = Cli::parse_from([
            "wxscrape", "storms", "--from", "2023-06-01", "--to", "2023-06-03", "--station", "KDEN",
        ]);
        let Commands::Storms(args) = cli.command else {
            panic!("Expected storms");
        };
        assert_eq!(args.from, Some(CalendarDate::new(2023, 6, 1).unwrap()));
        assert_eq!(args.to, Some(CalendarDate::new(2023, 6, 3).unwrap()));
        assert_eq!(args.station.as_deref(), Some("KDEN"));
    }

    #[test]
    fn test_cli_rejects_invalid_storm_date() {
        let result = Cli::try_parse_from(["wxscrape", "storms", "--from", "2023/06/01"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_event() {
        let cli = Cli::parse_from([
            "wxscrape", "event", "--date", "2023-07-04", "--time", "79200", "--station", "KDEN",
            "--utc-offset", "-7", "--dst", "--summary",
        ]);
        let Commands::Event(args) = cli.command else {
            panic!("Expected event");
        };
        assert_eq!(args.date, "2023-07-04");
        assert_eq!(args.time, 79200.0);
        assert_eq!(args.utc_offset, -7);
        assert!(args.dst);
        assert!(args.summary);
    }

    #[test]
    fn test_cli_event_defaults() {
        let cli = Cli::parse_from([
            "wxscrape", "event", "--date", "2023-07-04", "--time", "0", "--station", "KDEN",
        ]);
        let Commands::Event(args) = cli.command else {
            panic!("Expected event");
        };
        assert_eq!(args.utc_offset, 0);
        assert!(!args.dst);
        assert!(!args.summary);
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["wxscrape"]).is_err());
    }
}
