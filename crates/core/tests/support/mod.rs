//! Shared test helpers for `steeple-core` integration tests.
//!
//! These helpers provide reusable fixtures and lightweight mocks so that
//! service tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod calendar;
pub mod repositories;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use steeple_common::testing::MockClock;
use steeple_core::{
    CalendarService, EventCache, EventCacheSettings, PatternAnalyzer, PatternCache,
    PatternCacheSettings, ReconciliationService,
};
use steeple_domain::{AnalyzerConfig, RawEvent};

use self::calendar::{InMemoryRefreshLog, InMemorySnapshotRepository, MockEventSource};
use self::repositories::{InMemoryDirectory, InMemoryInstanceOverrides, InMemoryPatternRepository};

pub const TZ: Tz = chrono_tz::America::New_York;

/// Known ministry ids in the mock directory
pub const MINISTRIES: &[i64] = &[1, 2, 3];
/// Known special event type ids in the mock directory
pub const SPECIAL_EVENT_TYPES: &[i64] = &[10];

/// Local wall-clock time in the organisation timezone
pub fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    TZ.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().with_timezone(&Utc)
}

pub fn event(id: &str, title: &str, start: DateTime<Utc>) -> RawEvent {
    RawEvent {
        external_id: id.to_string(),
        title: title.to_string(),
        start,
        end: start + chrono::Duration::hours(1),
        location: None,
        description: None,
        is_all_day: false,
        is_part_of_recurring_series: true,
    }
}

/// `count` weekly occurrences at a local time, ids `<slug>-<n>`
pub fn weekly(
    title: &str,
    first: NaiveDate,
    hour: u32,
    minute: u32,
    count: u32,
    location: Option<&str>,
) -> Vec<RawEvent> {
    let slug = title.to_lowercase().replace(' ', "-");
    (0..count)
        .map(|n| {
            let date = first + chrono::Duration::weeks(i64::from(n));
            let start = TZ
                .from_local_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
                .unwrap()
                .with_timezone(&Utc);
            let mut e = event(&format!("{slug}-{n}"), title, start);
            e.location = location.map(str::to_string);
            e
        })
        .collect()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A congregation's March and April 2025 calendar
pub fn parish_calendar() -> Vec<RawEvent> {
    let mut events = Vec::new();
    // Sundays 2 March through 27 April
    events.extend(weekly("Sunday Worship", date(2025, 3, 2), 10, 30, 9, Some("Sanctuary")));
    events.extend(weekly("Youth Group", date(2025, 3, 3), 18, 0, 4, None));
    events.extend(weekly("Bible Study", date(2025, 3, 4), 19, 0, 4, Some("Fellowship Hall")));
    events.push(event("easter-egg-hunt", "Easter Egg Hunt", local(2025, 4, 19, 10, 0)));
    events
}

/// Everything wired together over in-memory ports
pub struct Harness {
    pub clock: MockClock,
    pub source: MockEventSource,
    pub snapshots: InMemorySnapshotRepository,
    pub refresh_log: InMemoryRefreshLog,
    pub patterns: InMemoryPatternRepository,
    pub overrides: InMemoryInstanceOverrides,
    pub calendar: Arc<CalendarService>,
    pub admin: ReconciliationService,
}

impl Harness {
    /// Clock pinned to Monday 10 March 2025, noon UTC
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self::with_fetch_timeout(events, Duration::from_secs(5))
    }

    pub fn with_fetch_timeout(events: Vec<RawEvent>, fetch_timeout: Duration) -> Self {
        let clock = MockClock::at(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap());
        let source = MockEventSource::new(events);
        let snapshots = InMemorySnapshotRepository::default();
        let refresh_log = InMemoryRefreshLog::default();
        let patterns = InMemoryPatternRepository::default();
        let overrides = InMemoryInstanceOverrides::default();

        let event_cache = EventCache::new(
            Arc::new(source.clone()),
            Arc::new(snapshots.clone()),
            Arc::new(refresh_log.clone()),
            Arc::new(clock.clone()),
            EventCacheSettings {
                timezone: TZ,
                staleness: chrono::Duration::hours(1),
                fetch_timeout,
                window_months: 6,
            },
        );
        let pattern_cache = PatternCache::new(
            PatternAnalyzer::new(TZ, AnalyzerConfig::default()),
            Arc::new(patterns.clone()),
            Arc::new(clock.clone()),
            PatternCacheSettings { timezone: TZ, staleness: chrono::Duration::hours(24) },
        );
        let calendar =
            Arc::new(CalendarService::new(event_cache, pattern_cache, Arc::new(clock.clone())));
        let admin = ReconciliationService::new(
            Arc::clone(&calendar),
            Arc::new(InMemoryDirectory::new(MINISTRIES, SPECIAL_EVENT_TYPES)),
            Arc::new(overrides.clone()),
        );

        Self { clock, source, snapshots, refresh_log, patterns, overrides, calendar, admin }
    }

    pub fn advance(&self, duration: chrono::Duration) {
        self.clock.advance(duration.to_std().unwrap());
    }
}
