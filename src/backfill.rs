//! Incremental weather backfill for the detector deployments
//!
//! Walks every configured unit's deployment records, expands each record into
//! station-date pairs and fetches the pairs that are not in the resolved set
//! yet. Every resolved pair is written to the store immediately, together with
//! the updated resolved set, so an interrupted run loses at most the pair it
//! was working on. Pairs that stay unavailable after all attempts are left
//! pending and picked up by the next run.

use std::io;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{LockOutcome, PidLock, ProcessLiveness, ResolvedSet, StoreError, WeatherStore};
use crate::config::{BackfillConfig, UnitConfig};
use crate::data::{Calendar, CalendarDate, CalendarError, ObservationFetcher};
use crate::deployment::{deployment_files, DeploymentRecord};

/// Errors that stop a backfill run
#[derive(Debug, Error)]
pub enum BackfillError {
    /// Progress could not be persisted
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The lock file could not be read or written
    #[error("Failed to take the backfill lock: {0}")]
    Lock(#[source] io::Error),

    /// The date has no compact form to key its table by
    #[error("Cannot store a table for this date: {0}")]
    Calendar(#[from] CalendarError),
}

/// Final state of one station-date pair within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    /// The table was fetched and stored
    Resolved,
    /// Every attempt failed; the pair stays pending
    Exhausted,
}

/// Counts of what a run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Pairs fetched and stored during this run
    pub resolved: usize,
    /// Pairs that failed every attempt
    pub exhausted: usize,
    /// Deployment records that could not be read
    pub skipped_records: usize,
}

/// Result of a locked backfill run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another live process holds the lock; nothing was done
    AlreadyRunning(u32),
    Completed(BackfillReport),
}

/// Backfill driver over a single store
pub struct Backfill<'a, F> {
    fetcher: &'a F,
    store: WeatherStore,
    calendar: Calendar,
    max_attempts: u32,
    resolved: ResolvedSet,
}

impl<'a, F: ObservationFetcher> Backfill<'a, F> {
    /// Creates a driver, loading the persisted resolved set from `store`
    ///
    /// # Returns
    /// * `Ok(Backfill)` - With an empty resolved set if none was persisted
    /// * `Err(BackfillError::Store)` - If the persisted set is unreadable
    pub fn new(
        fetcher: &'a F,
        store: WeatherStore,
        calendar: Calendar,
        max_attempts: u32,
    ) -> Result<Self, BackfillError> {
        let resolved = store.load_resolved()?;
        Ok(Self {
            fetcher,
            store,
            calendar,
            max_attempts,
            resolved,
        })
    }

    pub fn resolved(&self) -> &ResolvedSet {
        &self.resolved
    }

    /// Fetches one pair, retrying up to the attempt limit
    ///
    /// On success the table and the updated resolved set are persisted before
    /// returning. A pair that is already resolved is not fetched again. A date
    /// outside the configured century fails with `BackfillError::Calendar`
    /// before anything is fetched.
    pub async fn resolve_pair(
        &mut self,
        station: &str,
        date: CalendarDate,
    ) -> Result<PairOutcome, BackfillError> {
        let compact = self.calendar.to_compact(date)?;
        if self.resolved.contains(station, &compact) {
            return Ok(PairOutcome::Resolved);
        }

        for attempt in 1..=self.max_attempts {
            debug!(station, date = %date, attempt, "fetching observation table");
            match self.fetcher.fetch(date, station).await {
                Ok(table) => {
                    self.store.write_table(station, &compact, date, &table)?;
                    self.resolved.insert(station, &compact);
                    self.store.save_resolved(&self.resolved)?;
                    info!(station, date = %date, attempt, rows = table.len(), "resolved");
                    return Ok(PairOutcome::Resolved);
                }
                Err(_) => continue,
            }
        }

        warn!(station, date = %date, attempts = self.max_attempts, "table unavailable, leaving pending");
        Ok(PairOutcome::Exhausted)
    }

    /// Backfills every deployment record of one unit
    pub async fn backfill_unit(
        &mut self,
        unit: &UnitConfig,
        report: &mut BackfillReport,
    ) -> Result<(), BackfillError> {
        let files = match deployment_files(&unit.deployment_dir, &unit.name) {
            Ok(files) => files,
            Err(e) => {
                warn!(unit = %unit.name, dir = %unit.deployment_dir.display(), error = %e, "cannot list deployment records");
                return Ok(());
            }
        };
        debug!(unit = %unit.name, records = files.len(), "scanning deployments");

        for path in files {
            let record = match DeploymentRecord::read(&path) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "skipping deployment record");
                    report.skipped_records += 1;
                    continue;
                }
            };
            self.resolved.ensure_station(&record.station);

            let dates = match record.dates(&self.calendar) {
                Ok(dates) => dates,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping deployment record");
                    report.skipped_records += 1;
                    continue;
                }
            };

            for date in dates {
                if self.resolved.contains(&record.station, &self.calendar.to_compact(date)?) {
                    continue;
                }
                match self.resolve_pair(&record.station, date).await? {
                    PairOutcome::Resolved => report.resolved += 1,
                    PairOutcome::Exhausted => report.exhausted += 1,
                }
            }
        }
        Ok(())
    }

    /// Backfills every unit in order
    pub async fn backfill_all(&mut self, units: &[UnitConfig]) -> Result<BackfillReport, BackfillError> {
        let mut report = BackfillReport::default();
        for unit in units {
            self.backfill_unit(unit, &mut report).await?;
        }
        Ok(report)
    }
}

/// Runs the backfill under the single-instance lock
///
/// Returns `AlreadyRunning` without touching the store when a live process
/// holds the lock. The lock is released when the run ends, including on error.
pub async fn run<F, P>(
    config: &BackfillConfig,
    calendar: Calendar,
    fetcher: &F,
    liveness: &P,
) -> Result<RunOutcome, BackfillError>
where
    F: ObservationFetcher,
    P: ProcessLiveness,
{
    let store = WeatherStore::with_dir(config.weather_dir.clone());
    store.ensure_dir().map_err(BackfillError::Lock)?;

    let _lock = match PidLock::acquire(&store.lock_path(), liveness).map_err(BackfillError::Lock)? {
        LockOutcome::Acquired(lock) => lock,
        LockOutcome::Held(pid) => {
            debug!(pid, "backfill already running");
            return Ok(RunOutcome::AlreadyRunning(pid));
        }
    };

    let mut backfill = Backfill::new(fetcher, store, calendar, config.max_attempts)?;
    let report = backfill.backfill_all(&config.units).await?;
    info!(
        resolved = report.resolved,
        exhausted = report.exhausted,
        skipped_records = report.skipped_records,
        "backfill complete"
    );
    Ok(RunOutcome::Completed(report))
}
