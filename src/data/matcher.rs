//! Nearest-observation matching and condition classification
//!
//! An event is matched to the observation closest in time, and the conditions
//! in a window of `padding` rows either side decide its weather class.

use super::{ConditionClass, Observation};

/// Rows taken either side of the closest observation
pub const DEFAULT_PADDING: usize = 3;

/// Condition substrings that indicate lightning or hail
pub const LIGHTNING_KEYWORDS: [&str; 5] = ["Thunder", "T-Storm", "Storm", "Lightning", "Hail"];

const HEAVY_KEYWORD: &str = "Heavy";
const RAIN_KEYWORD: &str = "Rain";

/// Returns the index of the observation closest to `target_seconds`
///
/// Ties go to the earlier observation. Returns `None` for an empty slice.
pub fn closest_index(observations: &[Observation], target_seconds: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, observation) in observations.iter().enumerate() {
        let diff = (target_seconds - observation.seconds).abs();
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((i, diff)),
        }
    }
    best.map(|(i, _)| i)
}

/// Returns the conditions of `2 * padding + 1` rows centered on `index`
///
/// Slots before the first or after the last observation are `None`.
pub fn window_around(observations: &[Observation], index: usize, padding: usize) -> ObservationWindow {
    let slots = (0..=2 * padding)
        .map(|slot| {
            (index + slot)
                .checked_sub(padding)
                .and_then(|i| observations.get(i))
                .and_then(|observation| observation.condition.clone())
        })
        .collect();
    ObservationWindow { padding, slots }
}

/// Whether a condition label names lightning or hail
pub fn is_lightning(condition: &str) -> bool {
    LIGHTNING_KEYWORDS.iter().any(|keyword| condition.contains(keyword))
}

/// Lists every lightning or hail observation as "{condition} at {time}"
///
/// A row with an empty condition is passed over; later rows are still scanned.
pub fn storm_reports(observations: &[Observation]) -> Vec<String> {
    observations
        .iter()
        .filter_map(|observation| {
            let condition = observation.condition.as_deref()?;
            is_lightning(condition).then(|| format!("{} at {}", condition, observation.time_label))
        })
        .collect()
}

/// Conditions around an event, oldest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationWindow {
    padding: usize,
    slots: Vec<Option<String>>,
}

impl ObservationWindow {
    /// Builds the window around the observation closest to `target_seconds`
    ///
    /// An empty slice yields a window with every slot empty.
    pub fn around(observations: &[Observation], target_seconds: f64, padding: usize) -> Self {
        match closest_index(observations, target_seconds) {
            Some(index) => window_around(observations, index, padding),
            None => Self {
                padding,
                slots: vec![None; 2 * padding + 1],
            },
        }
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn slots(&self) -> &[Option<String>] {
        &self.slots
    }

    /// Classifies the window by its most severe condition
    ///
    /// Lightning or hail anywhere wins outright, then heavy rain, then rain.
    /// A window with no matching label is `Clear`; `Failure` is never produced
    /// here since a window implies a table was retrieved.
    pub fn classify(&self) -> ConditionClass {
        let mut heavy_rain = false;
        let mut rain = false;
        for condition in self.slots.iter().flatten() {
            if is_lightning(condition) {
                return ConditionClass::LightningOrHail;
            }
            if condition.contains(HEAVY_KEYWORD) {
                heavy_rain = true;
            } else if condition.contains(RAIN_KEYWORD) {
                rain = true;
            }
        }

        if heavy_rain {
            ConditionClass::HeavyRain
        } else if rain {
            ConditionClass::Rain
        } else {
            ConditionClass::Clear
        }
    }

    /// Renders the window as e.g. "Fair (-1hr), Rain (during), Fog (2hr)"
    pub fn summary(&self) -> String {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, condition)| {
                let condition = condition.as_deref()?;
                let hour = slot as i64 - self.padding as i64;
                Some(if hour == 0 {
                    format!("{} (during)", condition)
                } else {
                    format!("{} ({}hr)", condition, hour)
                })
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
