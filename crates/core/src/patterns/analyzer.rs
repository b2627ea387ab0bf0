//! Recurring pattern analyzer
//!
//! Groups occurrences by local weekday, local start time and normalised
//! title, then scores each group by how regularly its occurrences are spaced
//! one week apart. A single rescheduled occurrence lowers the score of its
//! whole group; outliers are not excluded.

use std::collections::BTreeMap;

use chrono::Duration;
use chrono_tz::Tz;
use steeple_domain::constants::{INTERVAL_TOLERANCE_DAYS, WEEKLY_INTERVAL_DAYS};
use steeple_domain::{
    infer_ministry_tag, normalize_title, AnalysisResult, AnalyzerConfig, Frequency, RawEvent,
    RecurringPattern,
};
use tracing::{debug, instrument};

/// (day of week, HH:MM, normalised title)
type BucketKey = (u8, String, String);

/// Stateless weekly-pattern detector
#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    timezone: Tz,
    min_occurrences: usize,
    confidence_threshold: f64,
}

impl PatternAnalyzer {
    #[must_use]
    pub fn new(timezone: Tz, config: AnalyzerConfig) -> Self {
        Self {
            timezone,
            min_occurrences: config.min_occurrences,
            confidence_threshold: config.confidence_threshold,
        }
    }

    /// Split events into weekly patterns and leftovers.
    ///
    /// Patterns come out ordered by day, time and title. Unmatched events are
    /// ordered by start.
    #[instrument(skip(self, events), fields(events = events.len()))]
    pub fn analyze(&self, events: &[RawEvent]) -> AnalysisResult {
        let mut buckets: BTreeMap<BucketKey, Vec<&RawEvent>> = BTreeMap::new();
        for event in events {
            let key = (
                event.day_of_week(self.timezone),
                event.local_time(self.timezone),
                normalize_title(&event.title),
            );
            buckets.entry(key).or_default().push(event);
        }

        let mut result = AnalysisResult::default();
        for ((day_of_week, time, title), mut members) in buckets {
            members.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.external_id.cmp(&b.external_id)));

            if members.len() < self.min_occurrences {
                result.unmatched.extend(members.into_iter().cloned());
                continue;
            }

            let confidence = interval_confidence(&members);
            if !passes_threshold(confidence, self.confidence_threshold) {
                debug!(%title, day_of_week, %time, confidence, "Bucket below confidence threshold");
                result.unmatched.extend(members.into_iter().cloned());
                continue;
            }

            result.patterns.push(self.build_pattern(day_of_week, time, confidence, &members));
        }

        result.unmatched.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.external_id.cmp(&b.external_id)));
        debug!(
            patterns = result.patterns.len(),
            unmatched = result.unmatched.len(),
            "Analysis complete"
        );
        result
    }

    fn build_pattern(
        &self,
        day_of_week: u8,
        time: String,
        confidence: f64,
        members: &[&RawEvent],
    ) -> RecurringPattern {
        // members is sorted, so the first is the earliest occurrence
        let representative = members[0];
        let location = members.iter().find_map(|e| non_blank(e.location.as_deref()));
        let description = non_blank(representative.description.as_deref())
            .or_else(|| members.iter().find_map(|e| non_blank(e.description.as_deref())));

        RecurringPattern {
            title: representative.title.clone(),
            day_of_week,
            time,
            location,
            frequency: Frequency::Weekly,
            confidence,
            matched_event_ids: members.iter().map(|e| e.external_id.clone()).collect(),
            ministry_tag: infer_ministry_tag(&representative.title, description.as_deref()),
        }
    }
}

/// Share of successive gaps that are a week apart, give or take two days.
///
/// `members` must be sorted by start. Fewer than two members score 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn interval_confidence(members: &[&RawEvent]) -> f64 {
    let week = Duration::days(WEEKLY_INTERVAL_DAYS);
    let tolerance = Duration::days(INTERVAL_TOLERANCE_DAYS);

    let deltas: Vec<Duration> = members.windows(2).map(|pair| pair[1].start - pair[0].start).collect();
    if deltas.is_empty() {
        return 0.0;
    }
    let weekly = deltas.iter().filter(|delta| (**delta - week).abs() <= tolerance).count();
    weekly as f64 / deltas.len() as f64
}

/// The threshold is exclusive: a score equal to it does not pass.
#[must_use]
pub fn passes_threshold(confidence: f64, threshold: f64) -> bool {
    confidence > threshold
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
