use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Number of markers kept; older ones are evicted first.
pub const DELIVERY_LEDGER_CAPACITY: i64 = 200;

/// Identity of one reminder kind for one occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerKey {
    pub event_id: String,
    /// Start exactly as reported by the calendar.
    pub event_start: String,
    pub label: String,
}

impl MarkerKey {
    pub fn new(
        event_id: impl Into<String>,
        event_start: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_start: event_start.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeliveryMarker {
    pub id: i64,
    pub event_id: String,
    pub event_start: String,
    pub label: String,
    pub sent_at: String,
}

impl DeliveryMarker {
    pub fn key(&self) -> MarkerKey {
        MarkerKey::new(&self.event_id, &self.event_start, &self.label)
    }

    pub async fn exists(
        pool: &sqlx::SqlitePool,
        key: &MarkerKey,
    ) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM delivery_markers WHERE event_id = ? AND event_start = ? AND label = ?"
        )
        .bind(&key.event_id)
        .bind(&key.event_start)
        .bind(&key.label)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }

    /// Inserts the marker and evicts the oldest ones beyond `capacity`.
    /// Returns `false` when the marker was already present.
    pub async fn record(
        pool: &sqlx::SqlitePool,
        key: &MarkerKey,
        capacity: i64,
    ) -> Result<bool, sqlx::Error> {
        let sent_at = Utc::now().to_rfc3339();
        let mut tx = pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO delivery_markers (event_id, event_start, label, sent_at) VALUES (?, ?, ?, ?)"
        )
        .bind(&key.event_id)
        .bind(&key.event_start)
        .bind(&key.label)
        .bind(&sent_at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        sqlx::query(
            r#"
            DELETE FROM delivery_markers
            WHERE id NOT IN (
                SELECT id FROM delivery_markers ORDER BY id DESC LIMIT ?
            )
            "#,
        )
        .bind(capacity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(inserted)
    }

    /// All markers, oldest first.
    pub async fn all(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DeliveryMarker>(
            "SELECT id, event_id, event_start, label, sent_at FROM delivery_markers ORDER BY id ASC"
        )
        .fetch_all(pool)
        .await
    }
}
