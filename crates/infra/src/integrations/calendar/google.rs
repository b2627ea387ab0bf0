//! Google Calendar event source
//!
//! Exchanges the configured refresh token for an access token, then pages
//! through `events.list` with `singleEvents=true` so the provider expands
//! recurring series into concrete occurrences.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use steeple_core::EventSource;
use steeple_domain::constants::GOOGLE_PAGE_SIZE;
use steeple_domain::{local_midnight, CalendarConfig, RawEvent, RefreshSource, Result, SteepleError};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::errors::InfraError;

/// Title used for occurrences that have no summary
const UNTITLED: &str = "Untitled event";

/// Refresh the access token this long before Google says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on pages followed for one window.
const MAX_PAGES: usize = 100;

/// OAuth client credentials and the long-lived refresh token
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Google Calendar implementation of [`EventSource`]
pub struct GoogleCalendarSource {
    client: Client,
    credentials: GoogleCredentials,
    calendar_id: String,
    api_base: Url,
    token_url: Url,
    timezone: Tz,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleCalendarSource {
    /// Build from calendar settings.
    ///
    /// # Errors
    /// `Config` when credentials are missing or a URL does not parse.
    pub fn from_config(config: &CalendarConfig) -> Result<Self> {
        let required = |value: &Option<String>, name: &str| {
            value.clone().filter(|v| !v.trim().is_empty()).ok_or_else(|| {
                SteepleError::Config(format!("calendar.{name} is required for the google provider"))
            })
        };
        let credentials = GoogleCredentials {
            client_id: required(&config.client_id, "client_id")?,
            client_secret: required(&config.client_secret, "client_secret")?,
            refresh_token: required(&config.refresh_token, "refresh_token")?,
        };

        Self::new(
            credentials,
            &config.calendar_id,
            &config.api_base_url,
            &config.token_url,
            config.timezone,
        )
    }

    /// # Errors
    /// `Config` when either URL does not parse.
    pub fn new(
        credentials: GoogleCredentials,
        calendar_id: &str,
        api_base: &str,
        token_url: &str,
        timezone: Tz,
    ) -> Result<Self> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| SteepleError::Config(format!("invalid URL {raw}: {e}")))
        };

        let client = Client::builder()
            .user_agent(concat!("steeple/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(InfraError::from)?;

        Ok(Self {
            client,
            credentials,
            calendar_id: calendar_id.to_string(),
            api_base: parse(api_base)?,
            token_url: parse(token_url)?,
            timezone,
            token: Mutex::new(None),
        })
    }

    fn events_url(&self) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| SteepleError::Config(format!("invalid API base {}", self.api_base)))?
            .pop_if_empty()
            .push("calendars")
            .push(&self.calendar_id)
            .push("events");
        Ok(url)
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        debug!("requesting access token");
        let response = self
            .client
            .post(self.token_url.clone())
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(InfraError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SteepleError::UpstreamUnavailable(format!(
                "token refresh failed ({status}): {}",
                truncate(&body)
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            SteepleError::UpstreamUnavailable(format!("unreadable token response: {e}"))
        })?;

        let lifetime = Duration::from_secs(u64::try_from(token.expires_in).unwrap_or(0));
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }

    async fn fetch_page(
        &self,
        access_token: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<EventsPage> {
        let mut url = self.events_url()?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("timeMin", &window_start.to_rfc3339_opts(SecondsFormat::Secs, true))
                .append_pair("timeMax", &window_end.to_rfc3339_opts(SecondsFormat::Secs, true))
                .append_pair("singleEvents", "true")
                .append_pair("orderBy", "startTime")
                .append_pair("maxResults", &GOOGLE_PAGE_SIZE.to_string());
            if let Some(page_token) = page_token {
                query.append_pair("pageToken", page_token);
            }
        }

        let response =
            self.client.get(url).bearer_auth(access_token).send().await.map_err(InfraError::from)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.forget_token().await;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SteepleError::UpstreamUnavailable(format!(
                "Google Calendar API error ({status}): {}",
                truncate(&body)
            )));
        }

        let body = response.bytes().await.map_err(InfraError::from)?;
        serde_json::from_slice(&body).map_err(|e| {
            SteepleError::UpstreamMalformed(format!("cannot decode events response: {e}"))
        })
    }
}

#[async_trait]
impl EventSource for GoogleCalendarSource {
    #[instrument(skip(self), fields(calendar_id = %self.calendar_id))]
    async fn fetch_events(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>> {
        let access_token = self.access_token().await?;

        let mut events = Vec::new();
        let mut skipped = 0usize;
        let mut page_token: Option<String> = None;

        for page_number in 1..=MAX_PAGES {
            let page = self
                .fetch_page(&access_token, window_start, window_end, page_token.as_deref())
                .await?;

            for item in page.items {
                match normalize_event(item, self.timezone) {
                    Ok(event) => events.push(event),
                    Err(reason) => {
                        skipped += 1;
                        warn!(reason = %reason, "skipping malformed calendar occurrence");
                    }
                }
            }

            debug!(page_number, fetched = events.len(), "fetched events page");
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        if page_token.is_some() {
            warn!(max_pages = MAX_PAGES, "stopped following pagination; window truncated");
        }
        if skipped > 0 {
            warn!(skipped, kept = events.len(), "some occurrences were skipped");
        }

        Ok(events)
    }

    fn source_kind(&self) -> RefreshSource {
        RefreshSource::ProviderApi
    }
}

/// Flatten one provider occurrence.
///
/// Returns the reason when the occurrence cannot be placed on the calendar.
fn normalize_event(item: GoogleEvent, tz: Tz) -> std::result::Result<RawEvent, String> {
    let id = item.id.filter(|id| !id.trim().is_empty()).ok_or("occurrence without id")?;

    let start = item.start.ok_or_else(|| format!("{id}: missing start"))?;
    let is_all_day = start.date_time.is_none() && start.date.is_some();
    let start = resolve_instant(&start, tz).map_err(|e| format!("{id}: start {e}"))?;

    let end = item
        .end
        .as_ref()
        .and_then(|end| resolve_instant(end, tz).ok())
        .filter(|end| *end >= start)
        .unwrap_or(start);

    let title = item
        .summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    Ok(RawEvent {
        external_id: id,
        title,
        start,
        end,
        location: non_blank(item.location),
        description: non_blank(item.description),
        is_all_day,
        is_part_of_recurring_series: item.recurring_event_id.is_some(),
    })
}

/// `dateTime` wins; an all-day `date` is pinned to local midnight.
fn resolve_instant(value: &EventDateTime, tz: Tz) -> std::result::Result<DateTime<Utc>, String> {
    if let Some(raw) = value.date_time.as_deref() {
        return DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("has unparseable dateTime {raw:?}: {e}"));
    }
    if let Some(raw) = value.date.as_deref() {
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| format!("has unparseable date {raw:?}: {e}"))?;
        return Ok(local_midnight(tz, date));
    }
    Err("has neither date nor dateTime".to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn truncate(body: &str) -> &str {
    let end = body.char_indices().nth(200).map_or(body.len(), |(i, _)| i);
    &body[..end]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<EventDateTime>,
    end: Option<EventDateTime>,
    recurring_event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

const fn default_expires_in() -> i64 {
    3600
}
