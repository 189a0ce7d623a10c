//! Persistence for the backfill driver
//!
//! This module stores fetched observation tables and the resolved set as JSON
//! files in the weather directory, and guards the directory with a pid lock so
//! that only one driver run works on it at a time.

mod lock;
mod resolved;
mod store;

pub use lock::{LockOutcome, PidLock, SystemLiveness, ProcessLiveness};
pub use resolved::ResolvedSet;
pub use store::{StoreError, StoredTable, WeatherStore, LOCK_FILE, RESOLVED_FILE};
