//! In-memory store backend, used by tests and as a reference for the
//! store contracts.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

use crate::database::models::{AttemptRecord, MarkerKey, RecipientEntry, DELIVERY_LEDGER_CAPACITY};
use crate::database::store::{
    DeliveryLedger, RecipientDirectory, ResultStore, StorageError, TimezoneStore,
};

/// Each collection sits behind its own lock.
pub struct MemoryStore {
    recipients: Mutex<HashMap<String, i64>>,
    ledger: Mutex<VecDeque<MarkerKey>>,
    ledger_capacity: usize,
    timezones: Mutex<HashMap<i64, String>>,
    attempts: Mutex<Vec<AttemptRecord>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_ledger_capacity(DELIVERY_LEDGER_CAPACITY as usize)
    }

    pub fn with_ledger_capacity(ledger_capacity: usize) -> Self {
        Self {
            recipients: Mutex::new(HashMap::new()),
            ledger: Mutex::new(VecDeque::new()),
            ledger_capacity,
            timezones: Mutex::new(HashMap::new()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Ledger contents, oldest first.
    pub async fn markers(&self) -> Vec<MarkerKey> {
        self.ledger.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl RecipientDirectory for MemoryStore {
    async fn upsert_recipient(&self, handle: &str, chat_id: i64) -> Result<(), StorageError> {
        self.recipients
            .lock()
            .await
            .insert(RecipientEntry::normalize_handle(handle), chat_id);
        Ok(())
    }

    async fn resolve_recipient(&self, handle: &str) -> Result<Option<i64>, StorageError> {
        Ok(self
            .recipients
            .lock()
            .await
            .get(&RecipientEntry::normalize_handle(handle))
            .copied())
    }
}

#[async_trait]
impl DeliveryLedger for MemoryStore {
    async fn was_delivered(&self, key: &MarkerKey) -> Result<bool, StorageError> {
        Ok(self.ledger.lock().await.contains(key))
    }

    async fn record_delivery(&self, key: &MarkerKey) -> Result<bool, StorageError> {
        let mut ledger = self.ledger.lock().await;
        if ledger.contains(key) {
            return Ok(false);
        }
        ledger.push_back(key.clone());
        while ledger.len() > self.ledger_capacity {
            ledger.pop_front();
        }
        Ok(true)
    }
}

#[async_trait]
impl TimezoneStore for MemoryStore {
    async fn timezone(&self, user_id: i64) -> Result<Option<String>, StorageError> {
        Ok(self.timezones.lock().await.get(&user_id).cloned())
    }

    async fn set_timezone(&self, user_id: i64, timezone: &str) -> Result<(), StorageError> {
        self.timezones
            .lock()
            .await
            .insert(user_id, timezone.to_string());
        Ok(())
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<(), StorageError> {
        self.attempts.lock().await.push(record.clone());
        Ok(())
    }

    async fn attempts_for_user(&self, user_id: i64) -> Result<Vec<AttemptRecord>, StorageError> {
        let attempts = self.attempts.lock().await;
        Ok(attempts
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }
}
