use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::utils::datetime::parse_timezone;

/// Timezones offered for manual selection, in display order.
pub const TIMEZONE_CHOICES: &[&str] = &[
    "Europe/Kaliningrad",
    "Europe/Moscow",
    "Europe/Samara",
    "Asia/Yekaterinburg",
    "Asia/Omsk",
    "Asia/Novosibirsk",
    "Asia/Irkutsk",
    "Asia/Vladivostok",
    "Europe/London",
    "Europe/Berlin",
    "Asia/Tbilisi",
    "Asia/Yerevan",
    "Asia/Almaty",
    "America/New_York",
];

#[derive(Debug, Error)]
pub enum TimezoneLookupError {
    #[error("timezone lookup failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Resolves coordinates to an IANA timezone name.
#[async_trait]
pub trait TimezoneResolver: Send + Sync {
    async fn lookup(&self, latitude: f64, longitude: f64) -> Result<Option<String>, TimezoneLookupError>;
}

#[derive(Debug, Deserialize)]
struct CoordinateResponse {
    #[serde(rename = "timeZone")]
    time_zone: Option<String>,
}

/// Client for a `?latitude=..&longitude=..` lookup service answering with
/// `{"timeZone": "Europe/Moscow", ...}` (timeapi.io compatible).
pub struct HttpTimezoneResolver {
    http: reqwest::Client,
    url: String,
}

impl HttpTimezoneResolver {
    pub fn new(url: impl Into<String>) -> Result<Self, TimezoneLookupError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, url: url.into() })
    }
}

#[async_trait]
impl TimezoneResolver for HttpTimezoneResolver {
    async fn lookup(&self, latitude: f64, longitude: f64) -> Result<Option<String>, TimezoneLookupError> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("latitude", latitude), ("longitude", longitude)])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(
                "Timezone lookup for ({}, {}) returned status {}",
                latitude,
                longitude,
                response.status()
            );
            return Ok(None);
        }

        let body: CoordinateResponse = response.json().await?;
        Ok(body
            .time_zone
            .filter(|name| parse_timezone(name).is_some()))
    }
}
