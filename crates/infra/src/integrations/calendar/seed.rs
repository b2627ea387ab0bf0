//! Seed-data event source for demos and local development
//!
//! Reads a JSON file of already-normalized occurrences, either a bare array
//! or `{ "events": [...] }`, and serves the ones starting inside the
//! requested window. The file is re-read on every fetch so edits show up on
//! the next refresh.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use steeple_core::EventSource;
use steeple_domain::{RawEvent, RefreshSource, Result, SteepleError};
use tracing::{debug, instrument};

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Bare(Vec<RawEvent>),
    Wrapped { events: Vec<RawEvent> },
}

/// File-backed implementation of [`EventSource`]
pub struct SeedDataSource {
    path: PathBuf,
}

impl SeedDataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventSource for SeedDataSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch_events(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>> {
        let contents = tokio::fs::read(&self.path).await.map_err(|e| {
            SteepleError::UpstreamUnavailable(format!(
                "cannot read seed file {}: {e}",
                self.path.display()
            ))
        })?;

        let parsed: SeedFile = serde_json::from_slice(&contents).map_err(|e| {
            SteepleError::UpstreamMalformed(format!(
                "seed file {} is not a list of events: {e}",
                self.path.display()
            ))
        })?;
        let events = match parsed {
            SeedFile::Bare(events) | SeedFile::Wrapped { events } => events,
        };

        let total = events.len();
        let in_window: Vec<RawEvent> = events
            .into_iter()
            .filter(|event| event.start >= window_start && event.start < window_end)
            .collect();

        debug!(total, in_window = in_window.len(), "loaded seed events");
        Ok(in_window)
    }

    fn source_kind(&self) -> RefreshSource {
        RefreshSource::SeedData
    }
}
