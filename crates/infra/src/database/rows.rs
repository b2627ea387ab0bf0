//! Column encoding shared by the SQLite repositories
//!
//! Instants are stored as epoch milliseconds, dates as ISO `YYYY-MM-DD`
//! text, enums by their label.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Row, ToSql};
use steeple_domain::PatternOverlay;

/// Overlay columns in binding order, shared by every table that carries one.
pub const OVERLAY_COLUMNS: &str = "ministry_link_id, special_event_type_id, is_special_event, \
     is_external, featured_on_home_page, note, image, contact_person, \
     recurring_description_override, ends_by_date";

/// Assignments matching [`OVERLAY_COLUMNS`], numbered from `first`.
pub fn overlay_assignments(first: usize) -> String {
    OVERLAY_COLUMNS
        .split(", ")
        .enumerate()
        .map(|(i, column)| format!("{} = ?{}", column.trim(), first + i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Owned overlay values in [`OVERLAY_COLUMNS`] order.
pub struct OverlayParams {
    ministry_link_id: Option<i64>,
    special_event_type_id: Option<i64>,
    is_special_event: bool,
    is_external: bool,
    featured_on_home_page: bool,
    note: Option<String>,
    image: Option<String>,
    contact_person: Option<String>,
    recurring_description_override: Option<String>,
    ends_by_date: Option<String>,
}

impl OverlayParams {
    pub fn new(overlay: &PatternOverlay) -> Self {
        Self {
            ministry_link_id: overlay.ministry_link_id,
            special_event_type_id: overlay.special_event_type_id,
            is_special_event: overlay.is_special_event,
            is_external: overlay.is_external,
            featured_on_home_page: overlay.featured_on_home_page,
            note: overlay.note.clone(),
            image: overlay.image.clone(),
            contact_person: overlay.contact_person.clone(),
            recurring_description_override: overlay.recurring_description_override.clone(),
            ends_by_date: overlay.ends_by_date.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }

    pub fn as_params(&self) -> [&dyn ToSql; 10] {
        [
            &self.ministry_link_id,
            &self.special_event_type_id,
            &self.is_special_event,
            &self.is_external,
            &self.featured_on_home_page,
            &self.note,
            &self.image,
            &self.contact_person,
            &self.recurring_description_override,
            &self.ends_by_date,
        ]
    }
}

pub fn read_overlay(row: &Row<'_>) -> rusqlite::Result<PatternOverlay> {
    let ends_by_date: Option<String> = row.get("ends_by_date")?;
    let ends_by_date = ends_by_date
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
        })
        .transpose()?;

    Ok(PatternOverlay {
        ministry_link_id: row.get("ministry_link_id")?,
        special_event_type_id: row.get("special_event_type_id")?,
        is_special_event: row.get("is_special_event")?,
        is_external: row.get("is_external")?,
        featured_on_home_page: row.get("featured_on_home_page")?,
        note: row.get("note")?,
        image: row.get("image")?,
        contact_person: row.get("contact_person")?,
        recurring_description_override: row.get("recurring_description_override")?,
        ends_by_date,
    })
}

pub fn read_instant(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(column)?;
    millis_to_instant(millis)
}

pub fn read_optional_instant(
    row: &Row<'_>,
    column: &str,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let millis: Option<i64> = row.get(column)?;
    millis.map(millis_to_instant).transpose()
}

fn millis_to_instant(millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Integer,
            format!("timestamp out of range: {millis}").into(),
        )
    })
}

/// Decode an enum stored by its label.
pub fn read_label<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(column)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into()))
}

pub fn read_optional_label<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = String>,
{
    let raw: Option<String> = row.get(column)?;
    raw.map(|value| {
        value
            .parse::<T>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into()))
    })
    .transpose()
}

pub fn read_json<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}
