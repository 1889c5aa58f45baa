use tokio_cron_scheduler::{JobScheduler, Job};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::LeadTime;
use crate::database::models::MarkerKey;
use crate::database::Stores;
use crate::services::calendar::{CalendarEvent, CalendarSource};
use crate::services::notifier::Notifier;
use crate::utils::datetime::{lead_includes_date, render_event_time, EventStart};
use crate::utils::logging::log_reminder;

const DEFAULT_SUMMARY: &str = "Встреча";

/// What happened to one (occurrence, reminder kind) pair during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    Delivered { chat_id: i64 },
    AlreadyNotified,
    NoRecipient,
    UnregisteredRecipient { handle: String },
    DeliveryFailed { chat_id: i64, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    pub key: MarkerKey,
    pub outcome: ReminderOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub outcomes: Vec<EventOutcome>,
    /// Labels whose calendar fetch failed this tick.
    pub failed_fetches: Vec<String>,
}

impl TickReport {
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, ReminderOutcome::Delivered { .. }))
            .count()
    }
}

/// Polls the calendar once per tick for every configured lead time and
/// delivers reminders that have not been delivered yet.
pub struct ReminderEngine {
    calendar: Arc<dyn CalendarSource>,
    notifier: Arc<dyn Notifier>,
    stores: Stores,
    lead_times: Vec<LeadTime>,
    slack: Duration,
}

impl ReminderEngine {
    pub fn new(
        calendar: Arc<dyn CalendarSource>,
        notifier: Arc<dyn Notifier>,
        stores: Stores,
        lead_times: Vec<LeadTime>,
        cadence_minutes: i64,
    ) -> Self {
        Self {
            calendar,
            notifier,
            stores,
            lead_times,
            slack: Duration::minutes(cadence_minutes),
        }
    }

    /// Half-open window `[now + lead - slack, now + lead + slack)`.
    pub fn window(&self, now: DateTime<Utc>, lead_minutes: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let target = now + Duration::minutes(lead_minutes);
        (target - self.slack, target + self.slack)
    }

    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();
        let mut delivered_this_tick = HashSet::new();

        for lead in &self.lead_times {
            let (time_min, time_max) = self.window(now, lead.minutes);

            let events = match self.calendar.list_events(time_min, time_max).await {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!(
                        "Calendar fetch for '{}' window {} - {} failed: {}",
                        lead.label, time_min, time_max, e
                    );
                    report.failed_fetches.push(lead.label.clone());
                    continue;
                }
            };

            for event in events {
                let starts_in_window = EventStart::parse(&event.start)
                    .and_then(EventStart::to_utc)
                    .map_or(true, |start| start >= time_min && start < time_max);
                if !starts_in_window {
                    continue;
                }

                let key = MarkerKey::new(&event.id, &event.start, &lead.label);
                let outcome = self
                    .process_event(&event, lead, &key, &mut delivered_this_tick)
                    .await;
                report.outcomes.push(EventOutcome { key, outcome });
            }
        }

        tracing::info!(
            "Reminder tick finished: {} delivered, {} processed, {} failed fetches",
            report.delivered(),
            report.outcomes.len(),
            report.failed_fetches.len()
        );
        report
    }

    async fn process_event(
        &self,
        event: &CalendarEvent,
        lead: &LeadTime,
        key: &MarkerKey,
        delivered_this_tick: &mut HashSet<MarkerKey>,
    ) -> ReminderOutcome {
        if delivered_this_tick.contains(key) {
            return ReminderOutcome::AlreadyNotified;
        }
        match self.stores.ledger.was_delivered(key).await {
            Ok(true) => {
                tracing::debug!("Reminder [{}] for event {} already sent", lead.label, event.id);
                return ReminderOutcome::AlreadyNotified;
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("Delivery ledger unreadable, treating as empty: {}", e),
        }

        let Some(handle) = event.recipient_handle() else {
            log_reminder("NO_RECIPIENT", &event.id, &lead.label, event.summary.as_deref());
            return ReminderOutcome::NoRecipient;
        };

        let chat_id = match self.stores.recipients.resolve_recipient(&handle).await {
            Ok(Some(chat_id)) => chat_id,
            Ok(None) => {
                log_reminder("UNREGISTERED", &event.id, &lead.label, Some(&format!("@{handle}")));
                return ReminderOutcome::UnregisteredRecipient { handle };
            }
            Err(e) => {
                tracing::warn!("Recipient directory unreadable, treating as empty: {}", e);
                return ReminderOutcome::UnregisteredRecipient { handle };
            }
        };

        let timezone = self.stores.timezones.timezone(chat_id).await.unwrap_or_else(|e| {
            tracing::warn!("Timezone store unreadable for {}: {}", chat_id, e);
            None
        });
        let text = reminder_text(event, lead, timezone.as_deref());

        match self.notifier.send(chat_id, &text).await {
            Ok(()) => {
                delivered_this_tick.insert(key.clone());
                if let Err(e) = self.stores.ledger.record_delivery(key).await {
                    tracing::error!("Failed to record delivery marker for {}: {}", event.id, e);
                }
                log_reminder("DELIVERED", &event.id, &lead.label, Some(&format!("@{handle}")));
                ReminderOutcome::Delivered { chat_id }
            }
            Err(e) => {
                log_reminder("DELIVERY_FAILED", &event.id, &lead.label, Some(&e.to_string()));
                ReminderOutcome::DeliveryFailed {
                    chat_id,
                    reason: e.reason,
                }
            }
        }
    }
}

/// `Напоминание: {summary} {label} ({time})`.
pub fn reminder_text(event: &CalendarEvent, lead: &LeadTime, timezone: Option<&str>) -> String {
    let summary = event
        .summary
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_SUMMARY);
    let time = render_event_time(&event.start, timezone, lead_includes_date(lead.minutes));
    format!("Напоминание: {} {} ({})", summary, lead.label, time)
}

/// Runs the engine on a fixed cadence. Ticks never overlap: a tick that
/// fires while the previous one is still running is skipped.
pub struct ReminderService {
    engine: Arc<ReminderEngine>,
    running: Arc<Mutex<()>>,
    cadence_minutes: i64,
    scheduler: JobScheduler,
}

impl ReminderService {
    pub async fn new(
        engine: Arc<ReminderEngine>,
        cadence_minutes: i64,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            engine,
            running: Arc::new(Mutex::new(())),
            cadence_minutes,
            scheduler,
        })
    }

    pub async fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let engine = self.engine.clone();
        let running = self.running.clone();
        let cadence = std::time::Duration::from_secs(self.cadence_minutes.unsigned_abs() * 60);

        let reminder_job = Job::new_repeated_async(cadence, move |_uuid, _l| {
            let engine = engine.clone();
            let running = running.clone();
            Box::pin(async move {
                run_guarded_tick(&engine, &running).await;
            })
        })?;

        self.scheduler.add(reminder_job).await?;
        self.scheduler.start().await?;

        tracing::info!(
            "Reminder service started - checking calendar every {} minutes",
            self.cadence_minutes
        );
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    /// Runs one tick immediately, unless one is already in progress.
    pub async fn check_reminders_now(&self) -> Option<TickReport> {
        run_guarded_tick(&self.engine, &self.running).await
    }
}

async fn run_guarded_tick(engine: &ReminderEngine, running: &Mutex<()>) -> Option<TickReport> {
    let Ok(_guard) = running.try_lock() else {
        tracing::warn!("Previous reminder tick still running, skipping this one");
        return None;
    };
    Some(engine.tick(Utc::now()).await)
}
