//! Shared fixtures for infra integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::America::New_York;
use steeple_domain::{
    DatabaseConfig, Frequency, Partition, PatternOverlay, PatternSource, RawEvent,
    RecurringPattern, StoredPattern,
};
use steeple_infra::database::DbManager;
use tempfile::TempDir;
use uuid::Uuid;

/// Migrated database in a temporary directory that lives as long as the
/// harness.
pub struct DbHarness {
    _temp_dir: TempDir,
    pub manager: Arc<DbManager>,
}

impl DbHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temporary directory should be created");
        let db_path = temp_dir.path().join("steeple-integration.db");

        let config = DatabaseConfig { pool_size: 4, ..DatabaseConfig::default() };
        let manager =
            Arc::new(DbManager::new(&db_path, &config).expect("database manager should initialise"));
        manager.run_migrations().expect("schema migrations should apply");

        Self { _temp_dir: temp_dir, manager }
    }
}

impl Default for DbHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock instant in the New York test timezone.
pub fn local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    New_York
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("unambiguous local time")
        .with_timezone(&Utc)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn event(id: &str, title: &str, start: DateTime<Utc>, location: Option<&str>) -> RawEvent {
    RawEvent {
        external_id: id.to_string(),
        title: title.to_string(),
        start,
        end: start + Duration::hours(1),
        location: location.map(str::to_string),
        description: None,
        is_all_day: false,
        is_part_of_recurring_series: true,
    }
}

/// `count` occurrences, one week apart, starting on `first`.
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
        .map(|week| {
            let day = first + Duration::weeks(i64::from(week));
            let start = local(day.year(), day.month(), day.day(), hour, minute);
            event(&format!("{slug}-{day}"), title, start, location)
        })
        .collect()
}

pub fn analyzer_row(
    partition: Partition,
    title: &str,
    location: Option<&str>,
    confidence: f64,
    computed_at: DateTime<Utc>,
) -> StoredPattern {
    StoredPattern {
        id: Uuid::now_v7().to_string(),
        partition,
        pattern: RecurringPattern {
            title: title.to_string(),
            day_of_week: 0,
            time: "10:30".to_string(),
            location: location.map(str::to_string),
            frequency: Frequency::Weekly,
            confidence,
            matched_event_ids: vec!["a".into(), "b".into(), "c".into()],
            ministry_tag: None,
        },
        overlay: PatternOverlay::default(),
        source: PatternSource::Analyzer,
        computed_at,
        overlay_updated_at: None,
    }
}
