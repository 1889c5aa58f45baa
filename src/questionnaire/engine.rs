//! Questionnaire state machine.
//!
//! The engine is pure: every transition takes the current session by value
//! and returns a [`Transition`] describing the next session (if any) and what
//! should be shown to the user. Persisting completed attempts and sending
//! messages is left to the caller.

use std::sync::Arc;

use crate::questionnaire::definition::{
    Catalog, Locale, QuestionnaireDefinition, QuestionnaireKind,
};
use crate::questionnaire::error::QuestionnaireError;
use crate::questionnaire::scoring;
use crate::questionnaire::session::{Answers, QuestionnaireSession};

/// A question as displayed, carrying the position its buttons refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub block: usize,
    pub question: usize,
    pub prompt: String,
    pub options: Vec<String>,
}

impl QuestionView {
    pub fn text(&self) -> String {
        let options: Vec<String> = self
            .options
            .iter()
            .enumerate()
            .map(|(i, label)| format!("{}: {}", i + 1, label))
            .collect();
        format!("{}\n\n{}", self.prompt, options.join("\n"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    BlockIntro { name: String, description: String },
    Question(QuestionView),
}

impl Prompt {
    pub fn text(&self) -> String {
        match self {
            Prompt::BlockIntro { name, description } => format!("{name}\n\n{description}"),
            Prompt::Question(view) => view.text(),
        }
    }
}

/// Why an input was refused without changing the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Click on a keyboard of a question that is no longer current.
    StaleSelection,
    /// Option or position outside the questionnaire.
    InvalidSelection,
    /// Back-step at the first question of a block.
    NothingToUndo,
}

impl Notice {
    pub fn text(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Notice::StaleSelection, Locale::Ru) => "Выберите один из вариантов текущего вопроса",
            (Notice::StaleSelection, Locale::En) => "Please pick an option of the current question",
            (Notice::InvalidSelection, Locale::Ru) => "Некорректный выбор",
            (Notice::InvalidSelection, Locale::En) => "Invalid selection",
            (Notice::NothingToUndo, Locale::Ru) => "Вернуться назад можно только в пределах текущего блока",
            (Notice::NothingToUndo, Locale::En) => "You can only step back within the current block",
        }
    }
}

/// A finished attempt ready to be persisted and reported.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedAttempt {
    pub kind: QuestionnaireKind,
    pub answers: Answers,
    pub score: Option<f64>,
    pub report: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Still answering; show `prompts` in order.
    Continue {
        session: QuestionnaireSession,
        prompts: Vec<Prompt>,
    },
    /// Input refused; `session` is returned unchanged.
    Rejected {
        session: QuestionnaireSession,
        notice: Notice,
    },
    Finished(CompletedAttempt),
    Abandoned { kind: QuestionnaireKind },
}

#[derive(Debug, Clone)]
pub struct QuestionnaireEngine {
    catalog: Arc<Catalog>,
}

impl QuestionnaireEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Creates a fresh session at the first question.
    pub fn start(&self, kind: QuestionnaireKind) -> Result<Transition, QuestionnaireError> {
        let definition = self.catalog.get(kind)?;
        Ok(advance(definition, QuestionnaireSession::new(kind), true))
    }

    /// Records `option` for the question at (`block`, `question`).
    ///
    /// Only the currently displayed question advances the session. A click
    /// on the immediately previous question of the same block replaces that
    /// answer; any other position is stale and leaves the session untouched.
    pub fn answer(
        &self,
        session: QuestionnaireSession,
        option: usize,
        question: usize,
        block: usize,
    ) -> Transition {
        let Ok(definition) = self.catalog.get(session.kind) else {
            return rejected(session, Notice::InvalidSelection);
        };
        let Some(weight) = definition
            .question(block, question)
            .and_then(|q| q.options.get(option))
            .map(|o| o.weight)
        else {
            return rejected(session, Notice::InvalidSelection);
        };

        let mut session = session;
        if block == session.block && question == session.question {
            session.answers.record(block, question, weight);
            session.question += 1;
            advance(definition, session, false)
        } else if block == session.block && question + 1 == session.question {
            session.answers.record(block, question, weight);
            let prompts = current_question(definition, &session).into_iter().collect();
            Transition::Continue { session, prompts }
        } else {
            rejected(session, Notice::StaleSelection)
        }
    }

    /// Undoes the most recent answer of the current block.
    pub fn back(&self, session: QuestionnaireSession) -> Transition {
        if session.question == 0 {
            return rejected(session, Notice::NothingToUndo);
        }
        let Ok(definition) = self.catalog.get(session.kind) else {
            return rejected(session, Notice::InvalidSelection);
        };

        let mut session = session;
        session.question -= 1;
        session.answers.remove(session.block, session.question);
        let prompts = current_question(definition, &session).into_iter().collect();
        Transition::Continue { session, prompts }
    }

    pub fn abandon(&self, session: QuestionnaireSession) -> Transition {
        Transition::Abandoned { kind: session.kind }
    }

    /// Re-renders the result of stored answers, e.g. for history browsing.
    pub fn render_result(
        &self,
        kind: QuestionnaireKind,
        answers: &Answers,
    ) -> Result<String, QuestionnaireError> {
        let definition = self.catalog.get(kind)?;
        Ok(scoring::render_result(definition, answers))
    }
}

fn rejected(session: QuestionnaireSession, notice: Notice) -> Transition {
    Transition::Rejected { session, notice }
}

/// Moves past exhausted blocks and emits what the user should see next.
fn advance(
    definition: &QuestionnaireDefinition,
    mut session: QuestionnaireSession,
    mut entered_block: bool,
) -> Transition {
    loop {
        let Some(block) = definition.blocks.get(session.block) else {
            return finish(definition, session);
        };
        if session.question < block.questions.len() {
            break;
        }
        session.block += 1;
        session.question = 0;
        entered_block = true;
    }

    let mut prompts = Vec::with_capacity(2);
    if entered_block {
        if let Some(block) = definition.blocks.get(session.block) {
            prompts.push(Prompt::BlockIntro {
                name: block.name.clone(),
                description: block.description.clone(),
            });
        }
    }
    prompts.extend(current_question(definition, &session));

    Transition::Continue { session, prompts }
}

fn current_question(
    definition: &QuestionnaireDefinition,
    session: &QuestionnaireSession,
) -> Option<Prompt> {
    let question = definition.question(session.block, session.question)?;
    Some(Prompt::Question(QuestionView {
        block: session.block,
        question: session.question,
        prompt: question.prompt.clone(),
        options: question.options.iter().map(|o| o.label.clone()).collect(),
    }))
}

fn finish(definition: &QuestionnaireDefinition, session: QuestionnaireSession) -> Transition {
    let score = scoring::aggregate_score(definition, &session.answers);
    let report = scoring::render_result(definition, &session.answers);
    Transition::Finished(CompletedAttempt {
        kind: session.kind,
        answers: session.answers,
        score,
        report,
    })
}
