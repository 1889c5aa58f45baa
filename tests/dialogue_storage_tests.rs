#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::types::ChatId;
use therapy_helper_bot::bot::handlers::schema;
use therapy_helper_bot::bot::ConversationState;
use therapy_helper_bot::questionnaire::{
    Catalog, QuestionnaireDefinition, QuestionnaireEngine, QuestionnaireKind, Transition,
};

const BECK: &str = r#"[{"name": "Депрессия", "description": "",
    "questions": [{"q": "Q1", "a": {"нет": 0, "да": 1}}, {"q": "Q2", "a": {"нет": 0, "да": 1}}]}]"#;

fn engine() -> QuestionnaireEngine {
    let definition = QuestionnaireDefinition::from_json(QuestionnaireKind::BeckRu, BECK).unwrap();
    QuestionnaireEngine::new(Arc::new(Catalog::from_definitions([definition])))
}

#[test]
fn test_dispatch_schema_builds() {
    let _schema = schema();
}

#[tokio::test]
async fn test_dialogue_starts_idle() {
    let storage = InMemStorage::<ConversationState>::new();
    let dialogue = Dialogue::new(storage, ChatId(1));

    assert_eq!(dialogue.get_or_default().await.unwrap(), ConversationState::Idle);
}

#[tokio::test]
async fn test_dialogue_keeps_questionnaire_session_per_chat() {
    let storage = InMemStorage::<ConversationState>::new();
    let first = Dialogue::new(storage.clone(), ChatId(1));
    let second = Dialogue::new(storage, ChatId(2));

    let session = match engine().start(QuestionnaireKind::BeckRu).unwrap() {
        Transition::Continue { session, .. } => session,
        other => panic!("expected Continue, got {other:?}"),
    };

    first
        .update(ConversationState::Questionnaire(session.clone()))
        .await
        .unwrap();
    second.update(ConversationState::TimezoneSetup).await.unwrap();

    assert_eq!(
        first.get().await.unwrap(),
        Some(ConversationState::Questionnaire(session))
    );
    assert_eq!(second.get().await.unwrap(), Some(ConversationState::TimezoneSetup));

    first.exit().await.unwrap();
    assert_eq!(first.get().await.unwrap(), None);
    assert_eq!(second.get().await.unwrap(), Some(ConversationState::TimezoneSetup));
}
