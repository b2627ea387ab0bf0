//! Title, time and location normalisation
//!
//! These functions define what "the same event" means. The analyzer buckets
//! on them and the composite key compares on them, so both paths agree on
//! case, punctuation and spacing.

use chrono::NaiveTime;

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

/// Normalise an event title for grouping.
///
/// Lowercases, drops apostrophes, turns every other punctuation character
/// into a space and collapses runs of whitespace.
///
/// ```
/// use steeple_domain::utils::title::normalize_title;
///
/// assert_eq!(normalize_title("  Men's  Breakfast!! "), "mens breakfast");
/// assert_eq!(normalize_title("Youth-Group"), "youth group");
/// ```
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}'))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalise a wall-clock time to `HH:MM`.
///
/// Accepts `H:MM`, `HH:MM`, `HH:MM:SS` and 12-hour `h:MM AM` forms. Seconds
/// are dropped. Returns `None` when the input is not a time.
///
/// ```
/// use steeple_domain::utils::title::normalize_time;
///
/// assert_eq!(normalize_time("9:30").as_deref(), Some("09:30"));
/// assert_eq!(normalize_time("7:00 PM").as_deref(), Some("19:00"));
/// assert_eq!(normalize_time("noon"), None);
/// ```
#[must_use]
pub fn normalize_time(time: &str) -> Option<String> {
    let trimmed = time.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .map(|parsed| parsed.format("%H:%M").to_string())
}

/// Normalise a location for comparison; blank locations become `None`.
#[must_use]
pub fn normalize_location(location: Option<&str>) -> Option<String> {
    let collapsed = location?.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.to_lowercase())
    }
}
