use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Maps a messaging handle to the chat reminders are delivered to.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct RecipientEntry {
    pub handle: String,
    pub chat_id: i64,
    pub updated_at: String,
}

impl RecipientEntry {
    /// Handles are stored lower-case without a leading '@'.
    pub fn normalize_handle(handle: &str) -> String {
        handle.trim().trim_start_matches('@').to_lowercase()
    }

    pub async fn upsert(
        pool: &sqlx::SqlitePool,
        handle: &str,
        chat_id: i64,
    ) -> Result<Self, sqlx::Error> {
        let handle = Self::normalize_handle(handle);
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO recipients (handle, chat_id, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(handle) DO UPDATE SET
                chat_id = excluded.chat_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&handle)
        .bind(chat_id)
        .bind(&now)
        .execute(pool)
        .await?;

        Ok(RecipientEntry {
            handle,
            chat_id,
            updated_at: now,
        })
    }

    pub async fn find_by_handle(
        pool: &sqlx::SqlitePool,
        handle: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RecipientEntry>(
            "SELECT handle, chat_id, updated_at FROM recipients WHERE handle = ?"
        )
        .bind(Self::normalize_handle(handle))
        .fetch_optional(pool)
        .await
    }

    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipients")
            .fetch_one(pool)
            .await
    }
}
