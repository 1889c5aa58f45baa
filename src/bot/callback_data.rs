//! Inline keyboard callback protocol.
//!
//! Telegram limits callback data to 64 bytes, so actions are encoded as
//! short colon separated tokens:
//!
//! | Action | Token |
//! |---|---|
//! | answer | `ans:{option}:{question}:{block}` (all 0-based) |
//! | back-step | `back` |
//! | quit | `quit` |
//! | pick a questionnaire | `test:{key}` |
//! | history list | `hist` |
//! | history entry | `hist:{index}` |
//! | pick a timezone | `tz:{index}` |

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::questionnaire::QuestionnaireKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Answer {
        option: usize,
        question: usize,
        block: usize,
    },
    Back,
    Quit,
    SelectTest(QuestionnaireKind),
    ViewHistory,
    ViewHistoryItem(usize),
    SelectTimezone(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackParseError {
    #[error("empty callback data")]
    Empty,

    #[error("unknown callback action '{0}'")]
    UnknownAction(String),

    #[error("malformed callback data '{0}'")]
    Malformed(String),

    #[error("unknown questionnaire '{0}'")]
    UnknownQuestionnaire(String),
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::Answer {
                option,
                question,
                block,
            } => write!(f, "ans:{option}:{question}:{block}"),
            CallbackAction::Back => f.write_str("back"),
            CallbackAction::Quit => f.write_str("quit"),
            CallbackAction::SelectTest(kind) => write!(f, "test:{}", kind.key()),
            CallbackAction::ViewHistory => f.write_str("hist"),
            CallbackAction::ViewHistoryItem(index) => write!(f, "hist:{index}"),
            CallbackAction::SelectTimezone(index) => write!(f, "tz:{index}"),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = CallbackParseError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let data = data.trim();
        if data.is_empty() {
            return Err(CallbackParseError::Empty);
        }

        let malformed = || CallbackParseError::Malformed(data.to_string());
        let index = |raw: &str| raw.parse::<usize>().map_err(|_| malformed());
        let parts: Vec<&str> = data.split(':').collect();

        match parts.as_slice() {
            ["ans", option, question, block] => Ok(CallbackAction::Answer {
                option: index(*option)?,
                question: index(*question)?,
                block: index(*block)?,
            }),
            ["back"] => Ok(CallbackAction::Back),
            ["quit"] => Ok(CallbackAction::Quit),
            ["test", key] => QuestionnaireKind::from_key(key)
                .map(CallbackAction::SelectTest)
                .ok_or_else(|| CallbackParseError::UnknownQuestionnaire(key.to_string())),
            ["hist"] => Ok(CallbackAction::ViewHistory),
            ["hist", i] => Ok(CallbackAction::ViewHistoryItem(index(*i)?)),
            ["tz", i] => Ok(CallbackAction::SelectTimezone(index(*i)?)),
            ["ans" | "back" | "quit" | "test" | "hist" | "tz", ..] => Err(malformed()),
            [tag, ..] => Err(CallbackParseError::UnknownAction(tag.to_string())),
            [] => Err(CallbackParseError::Empty),
        }
    }
}
