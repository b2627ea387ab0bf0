//! Integration tests for curated metadata writes

mod support;

use steeple_domain::{
    CompositeKeyInput, OverlayPatch, Partition, PatternSource, RefreshKind, SteepleError,
};
use support::{date, parish_calendar, weekly, Harness};

fn worship_key() -> CompositeKeyInput {
    CompositeKeyInput::new("Sunday Worship", 0, "10:30", None)
}

fn ministry(id: i64) -> OverlayPatch {
    OverlayPatch { ministry_link_id: Some(Some(id)), ..OverlayPatch::default() }
}

async fn refreshed() -> Harness {
    let h = Harness::new(parish_calendar());
    h.calendar.refresh(RefreshKind::Manual).await.unwrap();
    h
}

#[tokio::test]
async fn attach_requires_a_computed_partition() {
    let h = Harness::new(parish_calendar());

    let err = h.admin.attach_metadata(&worship_key(), &ministry(1)).await.unwrap_err();

    assert!(matches!(err, SteepleError::PatternNotFound(_)));
    assert_eq!(h.source.call_count(), 0);
}

#[tokio::test]
async fn attach_merges_into_matching_row() {
    let h = refreshed().await;
    let patch = OverlayPatch {
        ministry_link_id: Some(Some(2)),
        note: Some(Some("Nursery available".into())),
        ..OverlayPatch::default()
    };

    let row = h.admin.attach_metadata(&worship_key(), &patch).await.unwrap();

    assert_eq!(row.pattern.title, "Sunday Worship");
    assert_eq!(row.source, PatternSource::Analyzer);
    assert_eq!(row.overlay.ministry_link_id, Some(2));
    assert!(row.overlay_updated_at.is_some());

    let march = h.patterns.rows(Partition::new(3, 2025).unwrap());
    let stored = march.iter().find(|r| r.id == row.id).unwrap();
    assert_eq!(stored.overlay.note.as_deref(), Some("Nursery available"));
}

#[tokio::test]
async fn attach_creates_manual_row_that_survives_recompute() {
    let h = refreshed().await;
    let key = CompositeKeyInput::new("Deacons Meeting", 4, "7:00 PM", Some("Library"));
    let patch = OverlayPatch { is_special_event: Some(true), ..OverlayPatch::default() };

    let row = h.admin.attach_metadata(&key, &patch).await.unwrap();
    assert_eq!(row.source, PatternSource::Manual);
    assert_eq!(row.pattern.time, "19:00");

    let rows = h.calendar.refresh_partition(3, 2025).await.unwrap();
    let carried = rows.iter().find(|r| r.pattern.title == "Deacons Meeting").unwrap();
    assert_eq!(carried.source, PatternSource::Manual);
    assert!(carried.overlay.is_special_event);
}

#[tokio::test]
async fn unknown_ministry_is_rejected_without_writing() {
    let h = refreshed().await;
    let before = h.patterns.rows(Partition::new(3, 2025).unwrap());

    let err = h.admin.attach_metadata(&worship_key(), &ministry(99)).await.unwrap_err();

    assert_eq!(err, SteepleError::InvalidReference("ministry 99".into()));
    assert_eq!(h.patterns.rows(Partition::new(3, 2025).unwrap()), before);
}

#[tokio::test]
async fn one_bad_reference_rejects_the_whole_patch() {
    let h = refreshed().await;
    let before = h.patterns.rows(Partition::new(3, 2025).unwrap());
    let patch = OverlayPatch {
        ministry_link_id: Some(Some(1)),
        special_event_type_id: Some(Some(77)),
        is_external: Some(true),
        ..OverlayPatch::default()
    };

    let err = h.admin.apply_to_series(&worship_key(), &patch).await.unwrap_err();

    assert_eq!(err, SteepleError::InvalidReference("special event type 77".into()));
    assert_eq!(h.patterns.rows(Partition::new(3, 2025).unwrap()), before);
}

#[tokio::test]
async fn clearing_a_reference_skips_validation() {
    let h = refreshed().await;
    let patch = OverlayPatch { ministry_link_id: Some(None), ..OverlayPatch::default() };

    let row = h.admin.attach_metadata(&worship_key(), &patch).await.unwrap();

    assert_eq!(row.overlay.ministry_link_id, None);
}

#[tokio::test]
async fn empty_patch_is_invalid_input() {
    let h = refreshed().await;
    let err = h.admin.attach_metadata(&worship_key(), &OverlayPatch::default()).await.unwrap_err();
    assert!(matches!(err, SteepleError::InvalidInput(_)));
}

#[tokio::test]
async fn apply_to_series_updates_every_month() {
    let h = refreshed().await;

    let updated = h.admin.apply_to_series(&worship_key(), &ministry(3)).await.unwrap();

    // Sunday Worship runs through March and April
    assert_eq!(updated, 2);
    for month in [3, 4] {
        let rows = h.calendar.get_patterns(month, 2025, true).await.unwrap();
        let worship = rows.iter().find(|r| r.pattern.title == "Sunday Worship").unwrap();
        assert_eq!(worship.overlay.ministry_link_id, Some(3));
    }
}

#[tokio::test]
async fn blank_location_applies_to_every_location() {
    let h = refreshed().await;
    let chapel = CompositeKeyInput::new("Bible Study", 2, "19:00", Some("Chapel"));
    h.admin.attach_metadata(&chapel, &ministry(1)).await.unwrap();

    let any_room = CompositeKeyInput::new("Bible Study", 2, "19:00", None);
    let updated = h.admin.apply_to_series(&any_room, &ministry(2)).await.unwrap();

    assert_eq!(updated, 2);
    let march = h.patterns.rows(Partition::new(3, 2025).unwrap());
    let mut rooms: Vec<_> = march
        .iter()
        .filter(|r| r.pattern.title == "Bible Study")
        .map(|r| (r.pattern.location.clone(), r.overlay.ministry_link_id))
        .collect();
    rooms.sort();
    assert_eq!(
        rooms,
        vec![(Some("Chapel".to_string()), Some(2)), (Some("Fellowship Hall".to_string()), Some(2))]
    );

    // A named location leaves the other room alone
    h.admin.apply_to_series(&chapel, &ministry(3)).await.unwrap();
    let march = h.patterns.rows(Partition::new(3, 2025).unwrap());
    let hall = march
        .iter()
        .find(|r| r.pattern.location.as_deref() == Some("Fellowship Hall"))
        .unwrap();
    assert_eq!(hall.overlay.ministry_link_id, Some(2));
}

#[tokio::test]
async fn apply_to_series_with_no_match_updates_nothing() {
    let h = refreshed().await;
    let key = CompositeKeyInput::new("Sunday Worship", 0, "08:00", None);

    assert_eq!(h.admin.apply_to_series(&key, &ministry(1)).await.unwrap(), 0);
}

#[tokio::test]
async fn instance_override_requires_known_event() {
    let h = refreshed().await;
    let patch = OverlayPatch { note: Some(Some("Combined service".into())), ..OverlayPatch::default() };

    let err = h.admin.attach_metadata_to_instance("no-such-event", &patch).await.unwrap_err();
    assert!(matches!(err, SteepleError::NotFound(_)));
    assert_eq!(h.overrides.len(), 0);
}

#[tokio::test]
async fn instance_override_leaves_series_alone_and_survives_refresh() {
    let h = refreshed().await;
    let patch = OverlayPatch { note: Some(Some("Combined service".into())), ..OverlayPatch::default() };

    let result = h.admin.attach_metadata_to_instance("sunday-worship-2", &patch).await.unwrap();
    assert_eq!(result.event.external_id, "sunday-worship-2");
    assert_eq!(result.instance_override.overlay.note.as_deref(), Some("Combined service"));

    let march = h.calendar.get_patterns(3, 2025, true).await.unwrap();
    let worship = march.iter().find(|r| r.pattern.title == "Sunday Worship").unwrap();
    assert_eq!(worship.overlay.note, None);

    h.calendar.refresh(RefreshKind::Force).await.unwrap();
    let second = OverlayPatch { featured_on_home_page: Some(true), ..OverlayPatch::default() };
    let merged = h.admin.attach_metadata_to_instance("sunday-worship-2", &second).await.unwrap();
    assert_eq!(merged.instance_override.overlay.note.as_deref(), Some("Combined service"));
    assert!(merged.instance_override.overlay.featured_on_home_page);
}

#[tokio::test]
async fn instance_override_reads_back_through_listing_and_lookup() {
    let h = refreshed().await;
    let patch = OverlayPatch { is_external: Some(true), ..OverlayPatch::default() };
    h.admin.attach_metadata_to_instance("bible-study-1", &patch).await.unwrap();

    let events = h.admin.annotated_events(false).await.unwrap();
    assert_eq!(events.len(), parish_calendar().len());
    let annotated: Vec<_> = events
        .iter()
        .filter(|e| e.instance_override.is_some())
        .map(|e| e.event.external_id.as_str())
        .collect();
    assert_eq!(annotated, vec!["bible-study-1"]);

    let single = h.admin.instance_metadata("bible-study-1").await.unwrap();
    assert_eq!(single.event.title, "Bible Study");
    assert!(single.instance_override.unwrap().overlay.is_external);

    let plain = h.admin.instance_metadata("bible-study-2").await.unwrap();
    assert_eq!(plain.instance_override, None);

    let err = h.admin.instance_metadata("no-such-event").await.unwrap_err();
    assert!(matches!(err, SteepleError::NotFound(_)));
}

#[tokio::test]
async fn vanished_series_archives_its_overlay() {
    let h = refreshed().await;
    h.admin.attach_metadata(&worship_key(), &ministry(1)).await.unwrap();

    // The worship service moves to 11:00
    let mut moved = weekly("Sunday Worship", date(2025, 3, 2), 11, 0, 9, Some("Sanctuary"));
    moved.extend(weekly("Youth Group", date(2025, 3, 3), 18, 0, 4, None));
    h.source.respond_with(moved);
    h.calendar.refresh(RefreshKind::Manual).await.unwrap();

    let orphans = h.calendar.orphaned_overlays(10).await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].title, "Sunday Worship");
    assert_eq!(orphans[0].time, "10:30");
    assert_eq!(orphans[0].overlay.ministry_link_id, Some(1));

    let march = h.calendar.get_patterns(3, 2025, true).await.unwrap();
    let worship = march.iter().find(|r| r.pattern.title == "Sunday Worship").unwrap();
    assert_eq!(worship.pattern.time, "11:00");
    assert_eq!(worship.overlay.ministry_link_id, None);
}
