//! Recurring patterns, computed and stored

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_label_conversions;
use crate::types::event::RawEvent;
use crate::types::key::{CompositeKey, CompositeKeyInput};
use crate::types::overlay::PatternOverlay;
use crate::types::partition::Partition;
use crate::utils::ministry::{infer_ministry_tag, MinistryTag};
use crate::utils::title::normalize_time;

/// Recurrence cadence. Only weekly patterns are detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Weekly,
}

impl_label_conversions!(Frequency { Weekly => "weekly" });

/// Who created a stored pattern row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSource {
    #[default]
    Analyzer,
    /// Created by an operator attaching metadata to a key the analyzer did
    /// not emit
    Manual,
}

impl_label_conversions!(PatternSource {
    Analyzer => "analyzer",
    Manual => "manual",
});

/// Weekly template inferred from at least three occurrences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPattern {
    /// Verbatim title of the earliest occurrence
    pub title: String,
    /// Sunday = 0
    pub day_of_week: u8,
    /// Local `HH:MM`
    pub time: String,
    pub location: Option<String>,
    pub frequency: Frequency,
    pub confidence: f64,
    pub matched_event_ids: Vec<String>,
    pub ministry_tag: Option<MinistryTag>,
}

impl RecurringPattern {
    #[must_use]
    pub fn composite_key(&self) -> CompositeKey {
        CompositeKey::normalize(&self.title, self.day_of_week, &self.time, self.location.as_deref())
    }
}

/// Analyzer output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub patterns: Vec<RecurringPattern>,
    pub unmatched: Vec<RawEvent>,
}

/// A pattern cache row: computed fields, curated overlay and bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPattern {
    pub id: String,
    #[serde(flatten)]
    pub partition: Partition,
    #[serde(flatten)]
    pub pattern: RecurringPattern,
    #[serde(flatten)]
    pub overlay: PatternOverlay,
    pub source: PatternSource,
    pub computed_at: DateTime<Utc>,
    pub overlay_updated_at: Option<DateTime<Utc>>,
}

impl StoredPattern {
    /// Fresh analyzer row with an empty overlay
    #[must_use]
    pub fn from_analysis(
        partition: Partition,
        pattern: RecurringPattern,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            partition,
            pattern,
            overlay: PatternOverlay::default(),
            source: PatternSource::Analyzer,
            computed_at,
            overlay_updated_at: None,
        }
    }

    /// Operator-created row for a key the analyzer has not emitted.
    ///
    /// The display title and location are kept as typed; the time is
    /// normalised to `HH:MM`.
    #[must_use]
    pub fn manual(partition: Partition, input: &CompositeKeyInput, created_at: DateTime<Utc>) -> Self {
        let title = input.title.trim().to_string();
        let pattern = RecurringPattern {
            ministry_tag: infer_ministry_tag(&title, None),
            title,
            day_of_week: input.day_of_week,
            time: normalize_time(&input.time).unwrap_or_else(|| input.time.trim().to_string()),
            location: input
                .location
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            frequency: Frequency::Weekly,
            confidence: 0.0,
            matched_event_ids: Vec::new(),
        };
        Self {
            id: Uuid::now_v7().to_string(),
            partition,
            pattern,
            overlay: PatternOverlay::default(),
            source: PatternSource::Manual,
            computed_at: created_at,
            overlay_updated_at: None,
        }
    }

    #[must_use]
    pub fn composite_key(&self) -> CompositeKey {
        self.pattern.composite_key()
    }

    #[must_use]
    pub const fn is_external(&self) -> bool {
        self.overlay.is_external
    }

    /// Featured, public and not past its `endsByDate`
    #[must_use]
    pub fn is_featured_on(&self, today: NaiveDate) -> bool {
        self.overlay.featured_on_home_page
            && !self.overlay.is_external
            && self.overlay.ends_by_date.map_or(true, |ends| ends >= today)
    }
}

/// Pick the row a key refers to.
///
/// Among matching rows an exact location match wins, then the highest
/// confidence. Remaining ties go to the row listed first.
#[must_use]
pub fn select_best_match<'a>(
    key: &CompositeKey,
    rows: impl IntoIterator<Item = &'a StoredPattern>,
) -> Option<&'a StoredPattern> {
    let mut best: Option<(&StoredPattern, bool)> = None;
    for row in rows {
        let row_key = row.composite_key();
        if !key.matches(&row_key) {
            continue;
        }
        let exact = key.location_is_exact(&row_key);
        let better = match best {
            None => true,
            Some((current, current_exact)) => {
                (exact, row.pattern.confidence) > (current_exact, current.pattern.confidence)
            }
        };
        if better {
            best = Some((row, exact));
        }
    }
    best.map(|(row, _)| row)
}
