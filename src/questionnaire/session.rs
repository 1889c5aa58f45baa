use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::questionnaire::definition::QuestionnaireKind;

/// Recorded weights keyed by block index, then by question index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers(BTreeMap<usize, BTreeMap<usize, f64>>);

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, block: usize, question: usize, weight: f64) {
        self.0.entry(block).or_default().insert(question, weight);
    }

    pub fn remove(&mut self, block: usize, question: usize) -> Option<f64> {
        let block_answers = self.0.get_mut(&block)?;
        let removed = block_answers.remove(&question);
        if block_answers.is_empty() {
            self.0.remove(&block);
        }
        removed
    }

    pub fn get(&self, block: usize, question: usize) -> Option<f64> {
        self.0.get(&block)?.get(&question).copied()
    }

    /// Answers of one block in question order.
    pub fn block(&self, block: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.0
            .get(&block)
            .into_iter()
            .flat_map(|answers| answers.iter().map(|(q, w)| (*q, *w)))
    }

    pub fn block_total(&self, block: usize) -> f64 {
        self.block(block).map(|(_, w)| w).sum()
    }

    pub fn total(&self) -> f64 {
        self.0.values().flat_map(|answers| answers.values()).sum()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// In-progress attempt of one user.
///
/// `question` always points at the question currently displayed, so every
/// answer recorded for `block` has a question index strictly below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireSession {
    pub(crate) kind: QuestionnaireKind,
    pub(crate) block: usize,
    pub(crate) question: usize,
    pub(crate) answers: Answers,
}

impl QuestionnaireSession {
    pub(crate) fn new(kind: QuestionnaireKind) -> Self {
        Self {
            kind,
            block: 0,
            question: 0,
            answers: Answers::new(),
        }
    }

    pub fn kind(&self) -> QuestionnaireKind {
        self.kind
    }

    pub fn block(&self) -> usize {
        self.block
    }

    pub fn question(&self) -> usize {
        self.question
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }
}
