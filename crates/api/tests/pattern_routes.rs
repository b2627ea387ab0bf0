//! Route tests for recurring patterns and curated metadata.

mod support;

use axum::http::StatusCode;
use serde_json::{json, Value};
use steeple_domain::OverlayPatch;
use support::TestApp;

fn titles(rows: &Value) -> Vec<String> {
    rows.as_array()
        .unwrap()
        .iter()
        .map(|row| row["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn patterns_are_computed_on_first_read() {
    let app = TestApp::new();

    let (status, march) = app.get("/recurring-patterns?month=3&year=2025").await;

    assert_eq!(status, StatusCode::OK);
    let mut names = titles(&march);
    names.sort();
    assert_eq!(names, vec!["Sunday Worship", "Youth Group"]);

    let youth = march.as_array().unwrap().iter().find(|r| r["title"] == "Youth Group").unwrap();
    assert_eq!(youth["dayOfWeek"], 3);
    assert_eq!(youth["time"], "18:30");
    assert_eq!(youth["frequency"], "weekly");
    assert_eq!(youth["ministryTag"], "youth");
    assert_eq!(youth["month"], 3);
    assert_eq!(youth["year"], 2025);
}

#[tokio::test(flavor = "multi_thread")]
async fn omitted_partition_means_current_month() {
    let app = TestApp::new();

    let (status, rows) = app.get("/recurring-patterns").await;
    assert_eq!(status, StatusCode::OK);
    assert!(rows.as_array().unwrap().iter().all(|r| r["month"] == 3));

    let (status, body) = app.get("/recurring-patterns?month=3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "InvalidInput");

    let (status, _) = app.get("/recurring-patterns?month=13&year=2025").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn external_patterns_are_hidden_unless_requested() {
    let app = TestApp::new();
    app.post_empty("/calendar/refresh").await;

    let (status, _) = app
        .post(
            "/recurring-patterns/metadata",
            json!({ "title": "Youth Group", "dayOfWeek": 3, "time": "18:30", "isExternal": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, public) = app.get("/recurring-patterns?month=3&year=2025").await;
    assert_eq!(titles(&public), vec!["Sunday Worship"]);

    let (_, all) = app.get("/recurring-patterns?month=3&year=2025&includeExternal=true").await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn lookup_tolerates_case_and_missing_location() {
    let app = TestApp::new();
    app.post_empty("/calendar/refresh").await;

    let (status, row) =
        app.get("/recurring-patterns/lookup?title=SUNDAY%20WORSHIP&dayOfWeek=0&time=10:30").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["title"], "Sunday Worship");
    assert_eq!(row["location"], "Sanctuary");

    let (status, body) =
        app.get("/recurring-patterns/lookup?title=Choir&dayOfWeek=4&time=19:00").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "NotFound");
}

#[tokio::test(flavor = "multi_thread")]
async fn featured_patterns_respect_ends_by_date() {
    let app = TestApp::new();
    app.post_empty("/calendar/refresh").await;

    app.post(
        "/recurring-patterns/metadata",
        json!({
            "title": "Sunday Worship",
            "dayOfWeek": 0,
            "time": "10:30",
            "location": "Sanctuary",
            "featuredOnHomePage": true
        }),
    )
    .await;
    app.post(
        "/recurring-patterns/metadata",
        json!({
            "title": "Youth Group",
            "dayOfWeek": 3,
            "time": "18:30",
            "featuredOnHomePage": true,
            "endsByDate": "2025-03-01"
        }),
    )
    .await;

    let (status, featured) = app.get("/recurring-patterns/featured?month=3&year=2025").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&featured), vec!["Sunday Worship"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn metadata_before_any_computation_is_404() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/recurring-patterns/metadata",
            json!({ "title": "Sunday Worship", "dayOfWeek": 0, "time": "10:30", "note": "x" }),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "PatternNotFound");
}

#[tokio::test(flavor = "multi_thread")]
async fn metadata_for_unknown_key_creates_manual_row() {
    let app = TestApp::new();
    app.post_empty("/calendar/refresh").await;

    let (status, row) = app
        .post(
            "/recurring-patterns/metadata",
            json!({
                "title": "Men's Breakfast",
                "dayOfWeek": 6,
                "time": "08:00",
                "location": "Fellowship Hall",
                "note": "First Saturday"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["source"], "manual");
    assert_eq!(row["note"], "First Saturday");

    let (_, march) = app.get("/recurring-patterns?month=3&year=2025").await;
    assert!(titles(&march).contains(&"Men's Breakfast".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn apply_to_series_updates_every_month_or_rejects_atomically() {
    let app = TestApp::new();
    app.post_empty("/calendar/refresh").await;
    let body = json!({
        "title": "Sunday Worship",
        "dayOfWeek": 0,
        "time": "10:30",
        "ministryLinkId": 5
    });

    let (status, error) = app.post("/recurring-patterns/apply-to-series", body.clone()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"]["message"], "ministry 5");

    let (_, april) = app.get("/recurring-patterns?month=4&year=2025").await;
    assert!(april.as_array().unwrap().iter().all(|r| r["ministryLinkId"].is_null()));

    app.ctx.directory.upsert_ministry(5, "Worship Arts").await.unwrap();
    let (status, result) = app.post("/recurring-patterns/apply-to-series", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["updatedCount"], 2);

    let (_, april) = app.get("/recurring-patterns?month=4&year=2025").await;
    let worship = april.as_array().unwrap().iter().find(|r| r["title"] == "Sunday Worship").unwrap();
    assert_eq!(worship["ministryLinkId"], 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_patch_is_rejected() {
    let app = TestApp::new();
    app.post_empty("/calendar/refresh").await;

    let (status, body) = app
        .post(
            "/recurring-patterns/metadata",
            json!({ "title": "Sunday Worship", "dayOfWeek": 0, "time": "10:30" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "InvalidInput");
    assert!(OverlayPatch::default().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_current_month_and_orphans_listing() {
    let app = TestApp::new();
    app.post_empty("/calendar/refresh").await;

    let (status, rows) = app.post_empty("/recurring-patterns/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().unwrap().len(), 2);

    let (status, orphans) = app.get("/recurring-patterns/orphaned?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert!(orphans.as_array().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn curated_row_dropped_by_calendar_is_archived() {
    let app = TestApp::new();
    app.post_empty("/calendar/refresh").await;
    app.post(
        "/recurring-patterns/metadata",
        json!({ "title": "Youth Group", "dayOfWeek": 3, "time": "18:30", "note": "Pizza night" }),
    )
    .await;

    // Youth Group disappears from the calendar
    let worship_only: Vec<Value> = support::parish_calendar()
        .into_iter()
        .filter(|e| e["title"] != "Youth Group")
        .collect();
    let seed = app.ctx.config.calendar.seed_file.clone().unwrap();
    std::fs::write(&seed, serde_json::to_vec(&worship_only).unwrap()).unwrap();
    app.post_empty("/calendar/refresh").await;

    let (_, orphans) = app.get("/recurring-patterns/orphaned").await;
    let orphans = orphans.as_array().unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0]["title"], "Youth Group");
    assert_eq!(orphans[0]["note"], "Pizza night");
}
