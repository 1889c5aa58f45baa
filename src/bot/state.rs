use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::questionnaire::QuestionnaireSession;

/// Per-chat conversation state. Starting a questionnaire from any state
/// replaces whatever was there before.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConversationState {
    #[default]
    Idle,
    SelectingTest,
    Questionnaire(QuestionnaireSession),
    /// Waiting for a location, an IANA name or a button from the list.
    TimezoneSetup,
}

pub type BotDialogue = Dialogue<ConversationState, InMemStorage<ConversationState>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
