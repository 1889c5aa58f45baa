//! Multi-block questionnaires: definitions, sessions, the answering state
//! machine and result scoring.

pub mod definition;
pub mod engine;
pub mod error;
pub mod scoring;
pub mod sensory;
pub mod session;

pub use definition::{Catalog, Locale, QuestionnaireDefinition, QuestionnaireKind, ScoringPolicy};
pub use engine::{CompletedAttempt, Notice, Prompt, QuestionView, QuestionnaireEngine, Transition};
pub use error::QuestionnaireError;
pub use session::{Answers, QuestionnaireSession};
