#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use therapy_helper_bot::config::LeadTime;
use therapy_helper_bot::database::memory::MemoryStore;
use therapy_helper_bot::database::models::MarkerKey;
use therapy_helper_bot::database::{RecipientDirectory, Stores, TimezoneStore};
use therapy_helper_bot::services::calendar::{CalendarError, CalendarEvent, CalendarSource};
use therapy_helper_bot::services::notifier::{DeliveryError, Notifier};
use therapy_helper_bot::services::reminder::{
    reminder_text, ReminderEngine, ReminderOutcome, ReminderService,
};

/// Returns every scripted event regardless of the requested window.
#[derive(Default)]
struct ScriptedCalendar {
    events: Mutex<Vec<CalendarEvent>>,
    failing: Mutex<bool>,
    requests: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
}

impl ScriptedCalendar {
    fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Default::default()
        }
    }

    fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl CalendarSource for ScriptedCalendar {
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        self.requests.lock().unwrap().push((time_min, time_max));
        if *self.failing.lock().unwrap() {
            return Err(CalendarError::Status {
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        Ok(self.events.lock().unwrap().clone())
    }
}

/// Holds every fetch until `release` is notified.
#[derive(Default)]
struct BlockingCalendar {
    entered: Notify,
    release: Notify,
    requests: Mutex<usize>,
}

#[async_trait]
impl CalendarSource for BlockingCalendar {
    async fn list_events(
        &self,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        *self.requests.lock().unwrap() += 1;
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(i64, String)>>,
    failing_chats: Mutex<HashSet<i64>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn fail_for(&self, chat_id: i64, failing: bool) {
        let mut failing_chats = self.failing_chats.lock().unwrap();
        if failing {
            failing_chats.insert(chat_id);
        } else {
            failing_chats.remove(&chat_id);
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        if self.failing_chats.lock().unwrap().contains(&chat_id) {
            return Err(DeliveryError {
                chat_id,
                reason: "bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

struct Harness {
    engine: Arc<ReminderEngine>,
    calendar: Arc<ScriptedCalendar>,
    notifier: Arc<RecordingNotifier>,
    store: Arc<MemoryStore>,
}

fn default_lead_times() -> Vec<LeadTime> {
    vec![LeadTime::new(1440, "через сутки"), LeadTime::new(60, "через час")]
}

fn harness(events: Vec<CalendarEvent>, lead_times: Vec<LeadTime>) -> Harness {
    let calendar = Arc::new(ScriptedCalendar::with_events(events));
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(ReminderEngine::new(
        calendar.clone(),
        notifier.clone(),
        Stores::from_backend(store.clone()),
        lead_times,
        5,
    ));
    Harness {
        engine,
        calendar,
        notifier,
        store,
    }
}

fn event(id: &str, start: &str, summary: Option<&str>, description: Option<&str>) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        start: start.to_string(),
        summary: summary.map(str::to_string),
        description: description.map(str::to_string),
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

#[tokio::test]
async fn test_event_in_window_is_delivered_once() {
    let h = harness(
        vec![event(
            "evt-1",
            "2024-05-01T10:00:00Z",
            Some("Консультация"),
            Some("@alice\nsome notes"),
        )],
        default_lead_times(),
    );
    h.store.upsert_recipient("alice", 123).await.unwrap();

    let report = h.engine.tick(now()).await;

    assert_eq!(report.delivered(), 1);
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.notifier.sent()[0].0, 123);
    assert_eq!(
        h.store.markers().await,
        vec![MarkerKey::new("evt-1", "2024-05-01T10:00:00Z", "через час")]
    );

    // Next tick, windows overlap the same occurrence.
    let report = h.engine.tick(now() + chrono::Duration::minutes(5)).await;
    assert_eq!(report.delivered(), 0);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.outcome == ReminderOutcome::AlreadyNotified));
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.store.markers().await.len(), 1);
}

#[tokio::test]
async fn test_message_uses_recipient_timezone() {
    let h = harness(
        vec![event("evt-1", "2024-05-01T10:02:00Z", Some("Консультация"), Some("@Alice"))],
        default_lead_times(),
    );
    h.store.upsert_recipient("alice", 123).await.unwrap();
    h.store.set_timezone(123, "Europe/Moscow").await.unwrap();

    h.engine.tick(now()).await;

    assert_eq!(
        h.notifier.sent(),
        vec![(123, "Напоминание: Консультация через час (13:02)".to_string())]
    );
}

#[tokio::test]
async fn test_each_lead_time_is_a_separate_reminder() {
    let h = harness(
        vec![
            event("day", "2024-05-02T09:00:00Z", Some("Сессия"), Some("bob")),
            event("hour", "2024-05-01T10:00:00Z", Some("Сессия"), Some("bob")),
        ],
        default_lead_times(),
    );
    h.store.upsert_recipient("bob", 7).await.unwrap();

    let report = h.engine.tick(now()).await;

    assert_eq!(report.delivered(), 2);
    let labels: Vec<_> = h.store.markers().await.into_iter().map(|m| m.label).collect();
    assert_eq!(labels, vec!["через сутки".to_string(), "через час".to_string()]);
}

#[tokio::test]
async fn test_events_outside_window_are_ignored() {
    let h = harness(
        vec![
            event("early", "2024-05-01T09:54:59Z", None, Some("@alice")),
            event("edge", "2024-05-01T10:05:00Z", None, Some("@alice")),
        ],
        vec![LeadTime::new(60, "через час")],
    );
    h.store.upsert_recipient("alice", 123).await.unwrap();

    let report = h.engine.tick(now()).await;

    assert!(report.outcomes.is_empty());
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_window_bounds() {
    let h = harness(Vec::new(), default_lead_times());
    let (start, end) = h.engine.window(now(), 60);
    assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 1, 9, 55, 0).unwrap());
    assert_eq!(end, Utc.with_ymd_and_hms(2024, 5, 1, 10, 5, 0).unwrap());

    h.engine.tick(now()).await;
    let requests = h.calendar.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1], (start, end));
}

#[tokio::test]
async fn test_event_without_recipient_is_skipped() {
    let h = harness(
        vec![event("evt-1", "2024-05-01T10:00:00Z", Some("Супервизия"), Some("notes, not a handle"))],
        default_lead_times(),
    );

    let report = h.engine.tick(now()).await;

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].outcome, ReminderOutcome::NoRecipient);
    assert!(h.store.markers().await.is_empty());
}

#[tokio::test]
async fn test_unregistered_recipient_gets_no_marker() {
    let h = harness(
        vec![event("evt-1", "2024-05-01T10:00:00Z", None, Some("@stranger"))],
        default_lead_times(),
    );

    let report = h.engine.tick(now()).await;

    assert_eq!(
        report.outcomes[0].outcome,
        ReminderOutcome::UnregisteredRecipient {
            handle: "stranger".to_string()
        }
    );
    assert!(h.store.markers().await.is_empty());

    // Registering later makes the next tick deliver.
    h.store.upsert_recipient("@Stranger", 99).await.unwrap();
    let report = h.engine.tick(now()).await;
    assert_eq!(report.delivered(), 1);
}

#[tokio::test]
async fn test_failed_delivery_is_retried_next_tick() {
    let h = harness(
        vec![event("evt-1", "2024-05-01T10:00:00Z", None, Some("@alice"))],
        default_lead_times(),
    );
    h.store.upsert_recipient("alice", 123).await.unwrap();
    h.notifier.fail_for(123, true);

    let report = h.engine.tick(now()).await;
    assert!(matches!(
        report.outcomes[0].outcome,
        ReminderOutcome::DeliveryFailed { chat_id: 123, .. }
    ));
    assert!(h.store.markers().await.is_empty());

    h.notifier.fail_for(123, false);
    let report = h.engine.tick(now() + chrono::Duration::minutes(5)).await;
    assert_eq!(report.delivered(), 1);
    assert_eq!(h.store.markers().await.len(), 1);
}

#[tokio::test]
async fn test_calendar_failure_skips_tick_without_side_effects() {
    let h = harness(
        vec![event("evt-1", "2024-05-01T10:00:00Z", None, Some("@alice"))],
        default_lead_times(),
    );
    h.store.upsert_recipient("alice", 123).await.unwrap();
    h.calendar.set_failing(true);

    let report = h.engine.tick(now()).await;

    assert_eq!(report.failed_fetches, vec!["через сутки".to_string(), "через час".to_string()]);
    assert!(report.outcomes.is_empty());
    assert!(h.notifier.sent().is_empty());
    assert!(h.store.markers().await.is_empty());
}

#[tokio::test]
async fn test_duplicate_event_in_one_fetch_is_delivered_once() {
    let duplicate = event("evt-1", "2024-05-01T10:00:00Z", None, Some("@alice"));
    let h = harness(vec![duplicate.clone(), duplicate], default_lead_times());
    h.store.upsert_recipient("alice", 123).await.unwrap();

    let report = h.engine.tick(now()).await;

    assert_eq!(report.delivered(), 1);
    assert_eq!(report.outcomes[1].outcome, ReminderOutcome::AlreadyNotified);
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_unparseable_start_is_still_delivered_with_raw_time() {
    let h = harness(
        vec![event("evt-1", "soon", Some("Встреча группы"), Some("@alice"))],
        vec![LeadTime::new(60, "через час")],
    );
    h.store.upsert_recipient("alice", 123).await.unwrap();

    h.engine.tick(now()).await;

    assert_eq!(
        h.notifier.sent(),
        vec![(123, "Напоминание: Встреча группы через час (soon)".to_string())]
    );
}

#[test]
fn test_reminder_text_formats() {
    let long_lead = LeadTime::new(2880, "через двое суток");
    let timed = event("e", "2024-05-03T09:00:00Z", None, None);
    assert_eq!(
        reminder_text(&timed, &long_lead, None),
        "Напоминание: Встреча через двое суток (03.05.2024 09:00)"
    );

    let all_day = event("e", "2024-05-03", Some("Интенсив"), None);
    assert_eq!(
        reminder_text(&all_day, &LeadTime::new(60, "через час"), Some("Europe/Moscow")),
        "Напоминание: Интенсив через час (03.05.2024)"
    );

    let blank_summary = event("e", "2024-05-03T09:00:00+03:00", Some("  "), None);
    assert_eq!(
        reminder_text(&blank_summary, &LeadTime::new(1440, "через сутки"), None),
        "Напоминание: Встреча через сутки (09:00)"
    );
}

#[tokio::test]
async fn test_service_runs_a_tick_on_demand() {
    let h = harness(Vec::new(), default_lead_times());
    let service = ReminderService::new(h.engine.clone(), 5).await.unwrap();

    let report = service.check_reminders_now().await;

    assert!(report.is_some());
    assert_eq!(h.calendar.requests.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_tick_is_skipped_while_previous_one_runs() {
    let calendar = Arc::new(BlockingCalendar::default());
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(ReminderEngine::new(
        calendar.clone(),
        Arc::new(RecordingNotifier::default()),
        Stores::from_backend(store),
        vec![LeadTime::new(60, "через час")],
        5,
    ));
    let service = ReminderService::new(engine, 5).await.unwrap();

    let (first, second) = tokio::join!(service.check_reminders_now(), async {
        calendar.entered.notified().await;
        let second = service.check_reminders_now().await;
        calendar.release.notify_one();
        second
    });

    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(*calendar.requests.lock().unwrap(), 1);

    // The guard is released once the running tick finishes.
    let (third, ()) = tokio::join!(service.check_reminders_now(), async {
        calendar.entered.notified().await;
        calendar.release.notify_one();
    });
    assert!(third.is_some());
    assert_eq!(*calendar.requests.lock().unwrap(), 2);
}
