use anyhow::Result;
use std::sync::Arc;
use therapy_helper_bot::database::connection::DatabaseManager;
use therapy_helper_bot::database::memory::MemoryStore;
use therapy_helper_bot::database::models::*;
use therapy_helper_bot::database::{
    DeliveryLedger, RecipientDirectory, ResultStore, Stores, TimezoneStore,
};
use therapy_helper_bot::questionnaire::{Answers, QuestionnaireKind};
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

fn key(n: usize) -> MarkerKey {
    MarkerKey::new(format!("event-{n}"), "2024-05-01T10:00:00Z", "через час")
}

#[tokio::test]
async fn test_database_is_created_in_missing_directory() -> Result<()> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("nested").join("bot.db");
    let db = DatabaseManager::new(&format!("sqlite:{}", db_path.display())).await?;
    db.run_migrations().await?;
    db.ping().await?;

    assert!(db_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_recipient_lookup_is_case_insensitive() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    db.upsert_recipient("@Alice", 123).await?;

    assert_eq!(db.resolve_recipient("alice").await?, Some(123));
    assert_eq!(db.resolve_recipient("@ALICE").await?, Some(123));
    assert_eq!(db.resolve_recipient("bob").await?, None);

    let entry = RecipientEntry::find_by_handle(&db.pool, "ALICE").await?;
    assert_eq!(entry.map(|e| e.handle), Some("alice".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_recipient_upsert_replaces_chat() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    db.upsert_recipient("alice", 1).await?;
    db.upsert_recipient("Alice", 2).await?;

    assert_eq!(db.resolve_recipient("alice").await?, Some(2));
    assert_eq!(RecipientEntry::count(&db.pool).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_ledger_records_each_marker_once() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    assert!(!db.was_delivered(&key(1)).await?);
    assert!(db.record_delivery(&key(1)).await?);
    assert!(!db.record_delivery(&key(1)).await?);
    assert!(db.was_delivered(&key(1)).await?);

    // Same occurrence, different reminder kind.
    let other_label = MarkerKey::new("event-1", "2024-05-01T10:00:00Z", "через сутки");
    assert!(!db.was_delivered(&other_label).await?);
    Ok(())
}

#[tokio::test]
async fn test_ledger_evicts_oldest_beyond_capacity() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    for n in 0..=200 {
        db.record_delivery(&key(n)).await?;
    }

    let markers = DeliveryMarker::all(&db.pool).await?;
    assert_eq!(markers.len() as i64, DELIVERY_LEDGER_CAPACITY);
    assert!(!db.was_delivered(&key(0)).await?);
    assert!(db.was_delivered(&key(1)).await?);
    assert!(db.was_delivered(&key(200)).await?);
    assert_eq!(markers.first().map(DeliveryMarker::key), Some(key(1)));
    Ok(())
}

#[tokio::test]
async fn test_memory_ledger_matches_capacity_rule() -> Result<()> {
    let store = MemoryStore::with_ledger_capacity(3);

    for n in 0..4 {
        store.record_delivery(&key(n)).await?;
    }

    assert_eq!(store.markers().await, vec![key(1), key(2), key(3)]);
    assert!(!store.was_delivered(&key(0)).await?);
    Ok(())
}

#[tokio::test]
async fn test_timezone_store() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    assert_eq!(db.timezone(42).await?, None);
    db.set_timezone(42, "Europe/Moscow").await?;
    db.set_timezone(42, "Asia/Yekaterinburg").await?;

    assert_eq!(db.timezone(42).await?, Some("Asia/Yekaterinburg".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_attempt_history_is_newest_first() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let mut answers = Answers::new();
    answers.record(0, 0, 2.0);
    answers.record(0, 1, 0.5);

    let mut first = AttemptRecord::new(7, QuestionnaireKind::BeckRu, answers.clone(), Some(2.5));
    first.completed_at -= chrono::Duration::hours(1);
    let second = AttemptRecord::new(7, QuestionnaireKind::SensoryProfileEn, Answers::new(), None);
    let other_user = AttemptRecord::new(8, QuestionnaireKind::BeckEn, Answers::new(), Some(0.0));

    db.append_attempt(&first).await?;
    db.append_attempt(&second).await?;
    db.append_attempt(&other_user).await?;

    let history = db.attempts_for_user(7).await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id);
    assert_eq!(history[0].score, None);
    assert_eq!(history[1].id, first.id);
    assert_eq!(history[1].kind, QuestionnaireKind::BeckRu);
    assert_eq!(history[1].answers, answers);
    assert_eq!(history[1].score, Some(2.5));
    Ok(())
}

#[tokio::test]
async fn test_stores_share_one_backend() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let stores = Stores::from_backend(store.clone());

    stores.recipients.upsert_recipient("Carol", 5).await?;
    stores.timezones.set_timezone(5, "Europe/Berlin").await?;

    assert_eq!(store.resolve_recipient("carol").await?, Some(5));
    assert_eq!(store.timezone(5).await?, Some("Europe/Berlin".to_string()));
    Ok(())
}
