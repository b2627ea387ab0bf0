//! In-memory mocks for the event cache ports

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use steeple_core::{EventSnapshotRepository, EventSource, RefreshLogRepository};
use steeple_domain::{
    CacheRefreshRecord, EventSnapshot, RawEvent, RefreshSource, Result as DomainResult,
    SteepleError,
};

#[derive(Clone)]
enum Response {
    Events(Vec<RawEvent>),
    Fail(SteepleError),
    Hang,
}

/// Scriptable calendar provider.
///
/// Returns whatever it was last told to return and counts calls.
#[derive(Clone)]
pub struct MockEventSource {
    response: Arc<Mutex<Response>>,
    calls: Arc<Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>>,
}

impl MockEventSource {
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self {
            response: Arc::new(Mutex::new(Response::Events(events))),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn respond_with(&self, events: Vec<RawEvent>) {
        *self.response.lock().unwrap() = Response::Events(events);
    }

    pub fn fail_with(&self, err: SteepleError) {
        *self.response.lock().unwrap() = Response::Fail(err);
    }

    /// Never answer; exercises the fetch timeout
    pub fn hang(&self) {
        *self.response.lock().unwrap() = Response::Hang;
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.calls.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn fetch_events(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> DomainResult<Vec<RawEvent>> {
        self.calls.lock().unwrap().push((window_start, window_end));
        let response = self.response.lock().unwrap().clone();
        match response {
            Response::Events(events) => Ok(events
                .into_iter()
                .filter(|e| e.start >= window_start && e.start < window_end)
                .collect()),
            Response::Fail(err) => Err(err),
            Response::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    fn source_kind(&self) -> RefreshSource {
        RefreshSource::ProviderApi
    }
}

/// Snapshot store that can be told to fail its next replace
#[derive(Default, Clone)]
pub struct InMemorySnapshotRepository {
    snapshot: Arc<Mutex<Option<EventSnapshot>>>,
    fail_replace: Arc<Mutex<bool>>,
}

impl InMemorySnapshotRepository {
    pub fn fail_next_replace(&self) {
        *self.fail_replace.lock().unwrap() = true;
    }

    pub fn current(&self) -> Option<EventSnapshot> {
        self.snapshot.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSnapshotRepository for InMemorySnapshotRepository {
    async fn load_snapshot(&self) -> DomainResult<Option<EventSnapshot>> {
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn replace_snapshot(&self, snapshot: &EventSnapshot) -> DomainResult<()> {
        let mut fail = self.fail_replace.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(SteepleError::Database("disk I/O error".into()));
        }
        *self.snapshot.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }

    async fn find_event(&self, external_id: &str) -> DomainResult<Option<RawEvent>> {
        Ok(self
            .snapshot
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|s| s.events.iter().find(|e| e.external_id == external_id).cloned()))
    }
}

/// Append-only log kept in insertion order
#[derive(Default, Clone)]
pub struct InMemoryRefreshLog {
    records: Arc<Mutex<Vec<CacheRefreshRecord>>>,
}

impl InMemoryRefreshLog {
    pub fn all(&self) -> Vec<CacheRefreshRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RefreshLogRepository for InMemoryRefreshLog {
    async fn append(&self, record: &CacheRefreshRecord) -> DomainResult<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> DomainResult<Vec<CacheRefreshRecord>> {
        Ok(self.records.lock().unwrap().iter().rev().take(limit).cloned().collect())
    }
}
