//! Shared harness for route tests: a seeded context on a temp database with
//! the clock pinned to Monday 10 March 2025, 09:00 New York time.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::America::New_York;
use serde_json::{json, Value};
use steeple_api::{build_router, AppContext};
use steeple_common::time::MockClock;
use steeple_domain::{CalendarProviderKind, Config, DatabaseConfig};
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub ctx: Arc<AppContext>,
    pub clock: Arc<MockClock>,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_events(&parish_calendar())
    }

    pub fn with_events(events: &[Value]) -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let seed_path = temp_dir.path().join("seed.json");
        std::fs::write(&seed_path, serde_json::to_vec(&json!({ "events": events })).unwrap())
            .expect("seed file should be written");

        let mut config = Config {
            database: DatabaseConfig {
                path: temp_dir.path().join("steeple.db").to_string_lossy().into_owned(),
                pool_size: 4,
                ..DatabaseConfig::default()
            },
            ..Config::default()
        };
        config.calendar.provider = CalendarProviderKind::Seed;
        config.calendar.seed_file = Some(seed_path.to_string_lossy().into_owned());
        config.calendar.timezone = New_York;

        let clock = Arc::new(MockClock::at(local(2025, 3, 10, 9, 0)));
        let ctx = AppContext::new_with_clock(config, clock.clone())
            .expect("context should build");

        Self { ctx: Arc::new(ctx), clock, _temp_dir: temp_dir }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(Arc::clone(&self.ctx)).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }
}

pub fn local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    New_York
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("unambiguous local time")
        .with_timezone(&Utc)
}

/// Seed-file JSON for `count` weekly occurrences
pub fn weekly(
    title: &str,
    first: NaiveDate,
    hour: u32,
    minute: u32,
    count: u32,
    location: Option<&str>,
) -> Vec<Value> {
    let slug = title.to_lowercase().replace(' ', "-");
    (0..count)
        .map(|week| {
            let day = first + Duration::weeks(i64::from(week));
            let start = local(day.year(), day.month(), day.day(), hour, minute);
            json!({
                "externalId": format!("{slug}-{day}"),
                "title": title,
                "start": start,
                "end": start + Duration::hours(1),
                "location": location,
                "isAllDay": false,
                "isPartOfRecurringSeries": true
            })
        })
        .collect()
}

/// Sunday Worship through April, Youth Group on March Wednesdays, one retreat
pub fn parish_calendar() -> Vec<Value> {
    let mut events = weekly(
        "Sunday Worship",
        NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
        10,
        30,
        9,
        Some("Sanctuary"),
    );
    events.extend(weekly(
        "Youth Group",
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
        18,
        30,
        4,
        Some("Fellowship Hall"),
    ));
    let retreat = local(2025, 4, 12, 9, 0);
    events.push(json!({
        "externalId": "retreat",
        "title": "Spring Retreat",
        "start": retreat,
        "end": retreat + Duration::hours(8),
        "location": "Camp Galilee",
        "isAllDay": false,
        "isPartOfRecurringSeries": false
    }));
    events
}
