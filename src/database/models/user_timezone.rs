use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserTimezone {
    pub user_id: String,
    pub timezone: String,
    pub updated_at: String,
}

impl UserTimezone {
    pub async fn set(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        timezone: &str,
    ) -> Result<Self, sqlx::Error> {
        let user_id = user_id.to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO user_timezones (user_id, timezone, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                timezone = excluded.timezone,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&user_id)
        .bind(timezone)
        .bind(&now)
        .execute(pool)
        .await?;

        Ok(UserTimezone {
            user_id,
            timezone: timezone.to_string(),
            updated_at: now,
        })
    }

    pub async fn find(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserTimezone>(
            "SELECT user_id, timezone, updated_at FROM user_timezones WHERE user_id = ?"
        )
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await
    }
}
