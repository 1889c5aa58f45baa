use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::database::models::RecipientEntry;

/// One occurrence reported by the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    /// Start exactly as reported: an RFC 3339 instant or a `YYYY-MM-DD` date.
    pub start: String,
    pub summary: Option<String>,
    pub description: Option<String>,
}

impl CalendarEvent {
    pub fn recipient_handle(&self) -> Option<String> {
        self.description.as_deref().and_then(extract_recipient_handle)
    }
}

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("calendar returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unreadable calendar response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid calendar url: {0}")]
    Url(String),
}

/// Read-only view of an external calendar.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Events whose start falls in `[time_min, time_max)`.
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    /// Events addressed to `handle`, filtered client-side.
    async fn list_events_for_recipient_in_range(
        &self,
        handle: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let handle = RecipientEntry::normalize_handle(handle);
        let events = self.list_events(time_min, time_max).await?;
        Ok(events
            .into_iter()
            .filter(|event| event.recipient_handle().as_deref() == Some(handle.as_str()))
            .collect())
    }
}

/// Finds the recipient handle in an event description.
///
/// Lines are scanned top to bottom. The first line that starts with '@'
/// (which is stripped) or consists only of alphanumerics and underscores is
/// the handle, lower-cased.
pub fn extract_recipient_handle(description: &str) -> Option<String> {
    for line in description.lines() {
        let line = line.trim();
        if let Some(handle) = line.strip_prefix('@') {
            let handle = handle.trim();
            return (!handle.is_empty()).then(|| handle.to_lowercase());
        }
        if !line.is_empty() && line.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Some(line.to_lowercase());
        }
    }
    None
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    #[serde(default)]
    start: GoogleEventTime,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    date_time: Option<String>,
    date: Option<String>,
}

impl GoogleEvent {
    fn into_event(self) -> Option<CalendarEvent> {
        let start = self.start.date_time.or(self.start.date)?;
        Some(CalendarEvent {
            id: self.id,
            start,
            summary: self.summary,
            description: self.description,
        })
    }
}

/// Google Calendar v3 REST client. Obtaining the credentials is outside the
/// bot; either a bearer token or an API key (public calendars) is used.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
    calendar_id: String,
    access_token: Option<String>,
    api_key: Option<String>,
}

impl GoogleCalendarClient {
    pub fn new(
        base_url: impl Into<String>,
        calendar_id: impl Into<String>,
        access_token: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, CalendarError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            calendar_id: calendar_id.into(),
            access_token,
            api_key,
        })
    }

    fn events_url(&self) -> Result<reqwest::Url, CalendarError> {
        let mut url = reqwest::Url::parse(self.base_url.trim_end_matches('/'))
            .map_err(|e| CalendarError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| CalendarError::Url(self.base_url.clone()))?
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        Ok(url)
    }

    /// Parses one page of the events listing.
    pub fn parse_page(body: &str) -> Result<(Vec<CalendarEvent>, Option<String>), serde_json::Error> {
        let page: EventsPage = serde_json::from_str(body)?;
        let events = page
            .items
            .into_iter()
            .filter_map(GoogleEvent::into_event)
            .collect();
        Ok((events, page.next_page_token))
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let url = self.events_url()?;
        let time_min = time_min.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = time_max.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(url.clone()).query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            if let Some(key) = &self.api_key {
                request = request.query(&[("key", key.as_str())]);
            }
            if let Some(token) = &self.access_token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(CalendarError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let (page, next) = Self::parse_page(&body)?;
            tracing::debug!("Calendar page returned {} events", page.len());
            events.extend(page);

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }
}
