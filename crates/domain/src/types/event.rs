//! Raw calendar occurrences

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::types::partition::Partition;

/// One concrete occurrence as reported by the calendar provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Stable per-occurrence identifier from the provider
    pub external_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_all_day: bool,
    /// As reported by the provider; the analyzer does not rely on it.
    #[serde(default)]
    pub is_part_of_recurring_series: bool,
}

impl RawEvent {
    /// Start instant in the organisation timezone
    #[must_use]
    pub fn local_start(&self, tz: Tz) -> DateTime<Tz> {
        self.start.with_timezone(&tz)
    }

    /// Local day of week, Sunday = 0
    #[must_use]
    pub fn day_of_week(&self, tz: Tz) -> u8 {
        // num_days_from_sunday is always 0..=6
        self.local_start(tz).weekday().num_days_from_sunday() as u8
    }

    /// Local wall-clock start as `HH:MM`
    #[must_use]
    pub fn local_time(&self, tz: Tz) -> String {
        self.local_start(tz).format("%H:%M").to_string()
    }
}

/// The persisted raw event cache: one refresh's events and the window they
/// were fetched for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSnapshot {
    pub events: Vec<RawEvent>,
    pub window_start: DateTime<Utc>,
    /// Exclusive
    pub window_end: DateTime<Utc>,
    pub refreshed_at: DateTime<Utc>,
}

impl EventSnapshot {
    /// Whether the whole month lies inside the fetched window
    #[must_use]
    pub fn covers(&self, partition: Partition, tz: Tz) -> bool {
        let (start, end) = partition.window(tz);
        start >= self.window_start && end <= self.window_end
    }

    /// Events starting inside the month, in the organisation timezone
    #[must_use]
    pub fn events_in(&self, partition: Partition, tz: Tz) -> Vec<RawEvent> {
        self.events.iter().filter(|e| partition.contains(e.start, tz)).cloned().collect()
    }
}

/// Collapse duplicate `external_id`s, keeping the last occurrence.
///
/// Survivors keep the position of the first occurrence of their id. Returns
/// the deduplicated list and the number of rows dropped.
#[must_use]
pub fn dedupe_by_external_id(events: Vec<RawEvent>) -> (Vec<RawEvent>, usize) {
    let total = events.len();
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(total);
    let mut unique: Vec<RawEvent> = Vec::with_capacity(total);

    for event in events {
        if let Some(&index) = positions.get(&event.external_id) {
            unique[index] = event;
        } else {
            positions.insert(event.external_id.clone(), unique.len());
            unique.push(event);
        }
    }

    let dropped = total - unique.len();
    (unique, dropped)
}
