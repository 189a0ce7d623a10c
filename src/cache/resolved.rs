//! Record of station-date pairs that already have a stored table

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Station call sign to the compact dates already fetched for it
///
/// Persisted as a JSON object of arrays, in resolution order. Entries are only
/// ever appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedSet {
    stations: BTreeMap<String, Vec<String>>,
}

impl ResolvedSet {
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Whether the pair already has a stored table
    pub fn contains(&self, station: &str, compact_date: &str) -> bool {
        self.stations
            .get(station)
            .is_some_and(|dates| dates.iter().any(|d| d == compact_date))
    }

    /// Adds an empty entry for a station seen for the first time
    pub fn ensure_station(&mut self, station: &str) {
        self.stations.entry(station.to_string()).or_default();
    }

    /// Records a resolved pair; returns false if it was already present
    pub fn insert(&mut self, station: &str, compact_date: &str) -> bool {
        if self.contains(station, compact_date) {
            return false;
        }
        self.stations
            .entry(station.to_string())
            .or_default()
            .push(compact_date.to_string());
        true
    }

    /// Dates resolved for a station, in resolution order
    pub fn dates(&self, station: &str) -> &[String] {
        self.stations.get(station).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn stations(&self) -> impl Iterator<Item = &str> {
        self.stations.keys().map(String::as_str)
    }
}
