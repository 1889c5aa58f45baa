use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt::Display;

/// Lead times above this many minutes render the date as well as the time.
pub const DATE_LEAD_THRESHOLD_MINUTES: i64 = 1440;

/// Event start as reported by a calendar: an instant or an all-day date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStart {
    Instant(DateTime<FixedOffset>),
    Date(NaiveDate),
}

impl EventStart {
    pub fn parse(raw: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(EventStart::Instant(dt));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .map(EventStart::Date)
    }

    /// All-day events start at midnight UTC.
    pub fn to_utc(self) -> Option<DateTime<Utc>> {
        match self {
            EventStart::Instant(dt) => Some(dt.with_timezone(&Utc)),
            EventStart::Date(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        }
    }
}

pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Renders a reported start for a user: in `timezone` when it is a valid
/// IANA name, otherwise in the offset the calendar reported. Unparseable
/// starts are returned unchanged.
pub fn render_event_time(raw_start: &str, timezone: Option<&str>, include_date: bool) -> String {
    match EventStart::parse(raw_start) {
        Some(EventStart::Instant(dt)) => match timezone.and_then(parse_timezone) {
            Some(tz) => format_local(&dt.with_timezone(&tz), include_date),
            None => format_local(&dt, include_date),
        },
        Some(EventStart::Date(date)) => date.format("%d.%m.%Y").to_string(),
        None => raw_start.to_string(),
    }
}

/// Whether a reminder with this lead time should show the date.
pub fn lead_includes_date(lead_minutes: i64) -> bool {
    lead_minutes > DATE_LEAD_THRESHOLD_MINUTES
}

/// Formats a stored UTC timestamp in the user's timezone (UTC when unknown).
pub fn format_datetime(dt: &DateTime<Utc>, timezone: Option<&str>) -> String {
    match timezone.and_then(parse_timezone) {
        Some(tz) => format_local(&dt.with_timezone(&tz), true),
        None => format!("{} UTC", format_local(dt, true)),
    }
}

fn format_local<Z: TimeZone>(dt: &DateTime<Z>, include_date: bool) -> String
where
    Z::Offset: Display,
{
    if include_date {
        dt.format("%d.%m.%Y %H:%M").to_string()
    } else {
        dt.format("%H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_uses_reported_offset_without_timezone() {
        assert_eq!(render_event_time("2024-01-01T10:00:00+03:00", None, false), "10:00");
        assert_eq!(render_event_time("2024-01-01T10:00:00Z", None, true), "01.01.2024 10:00");
    }

    #[test]
    fn test_render_converts_to_user_timezone() {
        let rendered = render_event_time("2024-01-01T10:00:00Z", Some("Europe/Moscow"), true);
        assert_eq!(rendered, "01.01.2024 13:00");
    }

    #[test]
    fn test_render_ignores_invalid_timezone() {
        assert_eq!(render_event_time("2024-01-01T10:00:00Z", Some("Mars/Olympus"), false), "10:00");
    }

    #[test]
    fn test_render_date_only_and_garbage() {
        assert_eq!(render_event_time("2024-03-08", None, false), "08.03.2024");
        assert_eq!(render_event_time("tomorrow-ish", None, false), "tomorrow-ish");
    }

    #[test]
    fn test_lead_threshold() {
        assert!(!lead_includes_date(60));
        assert!(!lead_includes_date(1440));
        assert!(lead_includes_date(1441));
    }
}
