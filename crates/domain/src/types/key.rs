//! Composite key used to match patterns with curated overlays
//!
//! Patterns have no surrogate identity across recomputes. A pattern is "the
//! same" as a stored row when its normalised title, day of week and time are
//! equal and the locations agree, with a blank location on either side acting
//! as a wildcard. Every read and write path compares through this type.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SteepleError};
use crate::utils::title::{normalize_location, normalize_time, normalize_title};

/// Canonical, normalised pattern key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeKey {
    pub title: String,
    pub day_of_week: u8,
    pub time: String,
    pub location: Option<String>,
}

impl CompositeKey {
    /// Build a key from raw parts.
    ///
    /// A time that cannot be parsed is kept trimmed as-is so it only ever
    /// matches itself.
    #[must_use]
    pub fn normalize(title: &str, day_of_week: u8, time: &str, location: Option<&str>) -> Self {
        Self {
            title: normalize_title(title),
            day_of_week,
            time: normalize_time(time).unwrap_or_else(|| time.trim().to_string()),
            location: normalize_location(location),
        }
    }

    /// Title, day and time are equal and the locations agree (or either is
    /// blank).
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.title == other.title
            && self.day_of_week == other.day_of_week
            && self.time == other.time
            && match (&self.location, &other.location) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }

    /// Both sides carry the same non-blank location
    #[must_use]
    pub fn location_is_exact(&self, other: &Self) -> bool {
        self.location.is_some() && self.location == other.location
    }
}

/// Key fields as supplied by an operator, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeKeyInput {
    pub title: String,
    pub day_of_week: u8,
    pub time: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl CompositeKeyInput {
    #[must_use]
    pub fn new(title: &str, day_of_week: u8, time: &str, location: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            day_of_week,
            time: time.to_string(),
            location: location.map(str::to_string),
        }
    }

    /// Validate and normalise.
    ///
    /// # Errors
    /// Returns [`SteepleError::InvalidInput`] for a blank title, a day outside
    /// 0..=6 or an unparseable time.
    pub fn to_key(&self) -> Result<CompositeKey> {
        if normalize_title(&self.title).is_empty() {
            return Err(SteepleError::InvalidInput("title must not be blank".into()));
        }
        if self.day_of_week > 6 {
            return Err(SteepleError::InvalidInput(format!(
                "dayOfWeek must be 0-6, got {}",
                self.day_of_week
            )));
        }
        let time = normalize_time(&self.time)
            .ok_or_else(|| SteepleError::InvalidInput(format!("invalid time: {}", self.time)))?;
        Ok(CompositeKey::normalize(&self.title, self.day_of_week, &time, self.location.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_location_is_a_wildcard_on_either_side() {
        let query = CompositeKey::normalize("Bible Study", 2, "19:00", Some(""));
        let hall = CompositeKey::normalize("bible study", 2, "19:00", Some("Fellowship Hall"));
        let none = CompositeKey::normalize("BIBLE STUDY", 2, "19:00", None);

        assert!(query.matches(&hall));
        assert!(query.matches(&none));
        assert!(hall.matches(&query));
    }

    #[test]
    fn differing_locations_do_not_match() {
        let query = CompositeKey::normalize("Bible Study", 2, "19:00", Some("Fellowship Hall"));
        let chapel = CompositeKey::normalize("Bible Study", 2, "19:00", Some("Chapel"));
        assert!(!query.matches(&chapel));
    }

    #[test]
    fn day_and_time_must_be_exact() {
        let key = CompositeKey::normalize("Bible Study", 2, "19:00", None);
        assert!(!key.matches(&CompositeKey::normalize("Bible Study", 3, "19:00", None)));
        assert!(!key.matches(&CompositeKey::normalize("Bible Study", 2, "19:30", None)));
        assert!(key.matches(&CompositeKey::normalize("Bible Study", 2, "7:00 PM", None)));
    }

    #[test]
    fn input_validation() {
        assert!(CompositeKeyInput::new("Choir", 7, "19:00", None).to_key().is_err());
        assert!(CompositeKeyInput::new("Choir", 0, "late", None).to_key().is_err());
        assert!(CompositeKeyInput::new("  ", 0, "19:00", None).to_key().is_err());

        let key = CompositeKeyInput::new("Choir", 0, "9:00", Some(" Sanctuary ")).to_key().unwrap();
        assert_eq!(key.time, "09:00");
        assert_eq!(key.location.as_deref(), Some("sanctuary"));
    }
}
