//! Calendar event sources
//!
//! - Google Calendar (`provider = "google"`)
//! - Seed-data JSON file (`provider = "seed"`)

pub mod google;
pub mod seed;

use std::sync::Arc;

use steeple_core::EventSource;
use steeple_domain::{CalendarConfig, CalendarProviderKind, Result, SteepleError};
use tracing::info;

pub use google::{GoogleCalendarSource, GoogleCredentials};
pub use seed::SeedDataSource;

/// Build the event source selected by `calendar.provider`.
///
/// # Errors
/// `Config` when the selected provider is missing required settings.
pub fn create_event_source(config: &CalendarConfig) -> Result<Arc<dyn EventSource>> {
    match config.provider {
        CalendarProviderKind::Google => {
            info!(calendar_id = %config.calendar_id, "using Google Calendar event source");
            Ok(Arc::new(GoogleCalendarSource::from_config(config)?))
        }
        CalendarProviderKind::Seed => {
            let path = config.seed_file.as_deref().filter(|p| !p.trim().is_empty()).ok_or_else(
                || SteepleError::Config("calendar.seed_file is required for the seed provider".into()),
            )?;
            info!(path, "using seed-data event source");
            Ok(Arc::new(SeedDataSource::new(path)))
        }
    }
}
