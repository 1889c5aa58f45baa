use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::database::connection::DatabaseManager;
use crate::database::models::{
    AttemptRecord, DeliveryMarker, MarkerKey, RecipientEntry, UserTimezone,
    DELIVERY_LEDGER_CAPACITY,
};
use crate::utils::logging::{log_database_error, log_database_operation};

/// Errors surfaced by store backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handle → delivery address lookup used by the reminder engine.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn upsert_recipient(&self, handle: &str, chat_id: i64) -> Result<(), StorageError>;

    /// Case-insensitive; a leading '@' is ignored.
    async fn resolve_recipient(&self, handle: &str) -> Result<Option<i64>, StorageError>;
}

/// Bounded record of reminders already delivered.
#[async_trait]
pub trait DeliveryLedger: Send + Sync {
    async fn was_delivered(&self, key: &MarkerKey) -> Result<bool, StorageError>;

    /// Returns `false` if the marker already existed.
    async fn record_delivery(&self, key: &MarkerKey) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait TimezoneStore: Send + Sync {
    async fn timezone(&self, user_id: i64) -> Result<Option<String>, StorageError>;

    async fn set_timezone(&self, user_id: i64, timezone: &str) -> Result<(), StorageError>;
}

/// Append-only questionnaire history.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<(), StorageError>;

    /// Newest first.
    async fn attempts_for_user(&self, user_id: i64) -> Result<Vec<AttemptRecord>, StorageError>;
}

/// The four stores the engines and handlers work with.
#[derive(Clone)]
pub struct Stores {
    pub recipients: Arc<dyn RecipientDirectory>,
    pub ledger: Arc<dyn DeliveryLedger>,
    pub timezones: Arc<dyn TimezoneStore>,
    pub results: Arc<dyn ResultStore>,
}

impl Stores {
    /// Uses one backend for every store.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: RecipientDirectory + DeliveryLedger + TimezoneStore + ResultStore + 'static,
    {
        Self {
            recipients: backend.clone(),
            ledger: backend.clone(),
            timezones: backend.clone(),
            results: backend,
        }
    }
}

fn logged<T>(operation: &str, table: &str, result: Result<T, sqlx::Error>) -> Result<T, StorageError> {
    result.map_err(|e| {
        log_database_error(operation, table, &e.to_string(), None);
        StorageError::from(e)
    })
}

#[async_trait]
impl RecipientDirectory for DatabaseManager {
    async fn upsert_recipient(&self, handle: &str, chat_id: i64) -> Result<(), StorageError> {
        log_database_operation("UPSERT", "recipients", Some(handle));
        logged("UPSERT", "recipients", RecipientEntry::upsert(&self.pool, handle, chat_id).await)?;
        Ok(())
    }

    async fn resolve_recipient(&self, handle: &str) -> Result<Option<i64>, StorageError> {
        let entry = logged(
            "SELECT",
            "recipients",
            RecipientEntry::find_by_handle(&self.pool, handle).await,
        )?;
        Ok(entry.map(|e| e.chat_id))
    }
}

#[async_trait]
impl DeliveryLedger for DatabaseManager {
    async fn was_delivered(&self, key: &MarkerKey) -> Result<bool, StorageError> {
        logged("SELECT", "delivery_markers", DeliveryMarker::exists(&self.pool, key).await)
    }

    async fn record_delivery(&self, key: &MarkerKey) -> Result<bool, StorageError> {
        let _guard = self.ledger_lock.lock().await;
        log_database_operation(
            "INSERT",
            "delivery_markers",
            Some(&format!("{}_{} [{}]", key.event_id, key.event_start, key.label)),
        );
        logged(
            "INSERT",
            "delivery_markers",
            DeliveryMarker::record(&self.pool, key, DELIVERY_LEDGER_CAPACITY).await,
        )
    }
}

#[async_trait]
impl TimezoneStore for DatabaseManager {
    async fn timezone(&self, user_id: i64) -> Result<Option<String>, StorageError> {
        let entry = logged("SELECT", "user_timezones", UserTimezone::find(&self.pool, user_id).await)?;
        Ok(entry.map(|e| e.timezone))
    }

    async fn set_timezone(&self, user_id: i64, timezone: &str) -> Result<(), StorageError> {
        log_database_operation("UPSERT", "user_timezones", Some(timezone));
        logged("UPSERT", "user_timezones", UserTimezone::set(&self.pool, user_id, timezone).await)?;
        Ok(())
    }
}

#[async_trait]
impl ResultStore for DatabaseManager {
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<(), StorageError> {
        log_database_operation("INSERT", "attempts", Some(record.kind.key()));
        logged("INSERT", "attempts", AttemptRecord::create(&self.pool, record).await)
    }

    async fn attempts_for_user(&self, user_id: i64) -> Result<Vec<AttemptRecord>, StorageError> {
        logged("SELECT", "attempts", AttemptRecord::find_by_user(&self.pool, user_id).await)
    }
}
