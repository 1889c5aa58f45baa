use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::questionnaire::{Answers, CompletedAttempt, QuestionnaireKind};

/// History entry for one completed questionnaire attempt. Never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub id: String,
    pub user_id: i64,
    pub kind: QuestionnaireKind,
    pub completed_at: DateTime<Utc>,
    pub answers: Answers,
    pub score: Option<f64>,
}

#[derive(Debug, FromRow)]
struct AttemptRow {
    id: String,
    user_id: i64,
    questionnaire: String,
    completed_at: String,
    answers: String,
    score: Option<f64>,
}

impl AttemptRecord {
    pub fn new(user_id: i64, kind: QuestionnaireKind, answers: Answers, score: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            kind,
            completed_at: Utc::now(),
            answers,
            score,
        }
    }

    pub fn from_completed(user_id: i64, attempt: &CompletedAttempt) -> Self {
        Self::new(user_id, attempt.kind, attempt.answers.clone(), attempt.score)
    }

    pub async fn create(pool: &sqlx::SqlitePool, record: &AttemptRecord) -> Result<(), sqlx::Error> {
        let answers = serde_json::to_string(&record.answers)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        sqlx::query(
            r#"
            INSERT INTO attempts (id, user_id, questionnaire, completed_at, answers, score)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.user_id)
        .bind(record.kind.key())
        .bind(record.completed_at.to_rfc3339())
        .bind(answers)
        .bind(record.score)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Attempts of one user, newest first. Rows that no longer decode (for
    /// example a retired questionnaire key) are skipped.
    pub async fn find_by_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            "SELECT id, user_id, questionnaire, completed_at, answers, score FROM attempts WHERE user_id = ? ORDER BY completed_at DESC"
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().filter_map(AttemptRow::decode).collect())
    }
}

impl AttemptRow {
    fn decode(self) -> Option<AttemptRecord> {
        let Some(kind) = QuestionnaireKind::from_key(&self.questionnaire) else {
            tracing::warn!("Skipping attempt {} with unknown questionnaire '{}'", self.id, self.questionnaire);
            return None;
        };
        let completed_at = match DateTime::parse_from_rfc3339(&self.completed_at) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!("Skipping attempt {} with invalid timestamp: {}", self.id, e);
                return None;
            }
        };
        let answers = match serde_json::from_str(&self.answers) {
            Ok(answers) => answers,
            Err(e) => {
                tracing::warn!("Skipping attempt {} with invalid answers: {}", self.id, e);
                return None;
            }
        };

        Some(AttemptRecord {
            id: self.id,
            user_id: self.user_id,
            kind,
            completed_at,
            answers,
            score: self.score,
        })
    }
}
